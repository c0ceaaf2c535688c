//! Error types for graphae-nn.

use thiserror::Error;

/// graphae-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Graph construction or loading error.
    #[error("graph error: {0}")]
    Graph(#[from] graphae_core::Error),

    /// Invalid hyperparameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The graph lacks something the model needs (e.g. node features).
    #[error("unsupported graph: {0}")]
    UnsupportedGraph(String),

    /// The graph has no edges, so the reconstruction weights are undefined.
    #[error("degenerate graph: {0}")]
    DegenerateGraph(String),

    /// Loss became NaN or infinite; the optimizer step was not applied.
    #[error("training diverged at epoch {epoch}: loss = {loss}")]
    TrainingDiverged { epoch: usize, loss: f32 },

    /// `train_model` / `get_embeddings` called before `build`.
    #[error("model is not built")]
    NotBuilt,

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single out-of-range or missing hyperparameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Name of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every constraint a configuration violates, not just the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid configuration: {}", join_violations(.violations))]
pub struct ConfigError {
    pub violations: Vec<Violation>,
}

impl ConfigError {
    /// Names of the offending fields, in check order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    /// Whether `field` is among the violations.
    pub fn contains(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
