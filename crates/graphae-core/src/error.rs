use thiserror::Error;

/// Errors that can occur while building or loading a graph.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in an input file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Node ID not present in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Feature vector length disagrees with earlier rows.
    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    FeatureDimension { expected: usize, got: usize },

    /// Feature matrix requested from a graph that is not fully attributed.
    #[error("graph is not attributed: {missing} of {total} nodes have no features")]
    MissingFeatures { missing: usize, total: usize },
}

/// Result type alias for graphae-core.
pub type Result<T> = std::result::Result<T, Error>;
