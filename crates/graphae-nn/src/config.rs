//! Hyperparameters for graph autoencoders.
//!
//! [`TrainConfig`] is the fully resolved configuration a model is built with.
//! [`TrainParams`] is its partial counterpart: every field optional, numeric
//! fields signed so that out-of-range input (e.g. `"epochs": -5`) is reported
//! as a violation rather than a deserialization failure. Resolving params
//! against per-model defaults checks every range and reports all violations
//! at once.
//!
//! # Example
//!
//! ```rust
//! use graphae_nn::config::TrainParams;
//! use graphae_nn::ModelKind;
//!
//! let params: TrainParams = serde_json::from_str(r#"{"lr": -0.1, "dropout": 2.0}"#).unwrap();
//! let err = ModelKind::Gae.check_train_parameters(&params).unwrap_err();
//! assert_eq!(err.fields(), vec!["lr", "dropout"]);
//! ```

use crate::error::{ConfigError, Result, Violation};
use candle_core::Device;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Which autoencoder variant to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Graph autoencoder: the encoder output is the embedding.
    Gae,
    /// Variational graph autoencoder: embeddings are the posterior mean.
    Vgae,
}

impl ModelKind {
    /// Whether the encoder ends in a mean / log-std split.
    pub fn is_variational(self) -> bool {
        matches!(self, ModelKind::Vgae)
    }

    /// Default hyperparameters for this model.
    pub fn defaults(self) -> TrainConfig {
        match self {
            ModelKind::Gae => TrainConfig::default(),
            ModelKind::Vgae => TrainConfig {
                lr: 0.1,
                epochs: 300,
                clf_ratio: 0.8,
                ..TrainConfig::default()
            },
        }
    }

    /// Fill missing fields with this model's defaults and check every range.
    pub fn check_train_parameters(
        self,
        params: &TrainParams,
    ) -> std::result::Result<TrainConfig, ConfigError> {
        params.resolve(&self.defaults())
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Gae => write!(f, "gae"),
            ModelKind::Vgae => write!(f, "vgae"),
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gae" => Ok(ModelKind::Gae),
            "vgae" => Ok(ModelKind::Vgae),
            other => Err(format!("unknown model {other:?} (expected gae or vgae)")),
        }
    }
}

/// Resolved training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Adam learning rate, in (0, inf). Default: 0.01 (GAE), 0.1 (VGAE).
    pub lr: f64,
    /// Number of epochs the driver runs, > 0. Default: 200 (GAE), 300 (VGAE).
    pub epochs: usize,
    /// Input dropout rate of every layer, in [0, 1]. Default: 0.
    pub dropout: f64,
    /// Weight decay, in (0, 1). Only applied with `apply_weight_decay`. Default: 1e-4.
    pub weight_decay: f64,
    /// Epochs without loss improvement before the driver stops, > 0. Default: 100.
    pub early_stopping: usize,
    /// Train fraction for the downstream classifier, in (0, 1).
    pub clf_ratio: f64,
    /// Hidden layer sizes. Default: [32].
    pub hiddens: Vec<usize>,
    /// Embedding dimension, > 0. Default: 16.
    pub output_dim: usize,
    /// Chebyshev degree; 0 selects the renormalized adjacency. Default: 0.
    pub max_degree: usize,
    /// Store the feature matrix in CSR form during preprocessing.
    pub sparse: bool,
    /// Seed for weight init, dropout masks and VGAE noise.
    pub seed: u64,
    /// Give every layer one weight per propagation operator instead of
    /// propagating with the first operator only.
    pub use_all_supports: bool,
    /// Pass `weight_decay` to the optimizer (decoupled, AdamW style).
    pub apply_weight_decay: bool,
    /// Place tensors on a CUDA device when one is available.
    pub use_gpu: bool,
    /// CUDA ordinal used with `use_gpu`.
    pub gpu_device_id: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lr: 0.01,
            epochs: 200,
            dropout: 0.0,
            weight_decay: 1e-4,
            early_stopping: 100,
            clf_ratio: 0.5,
            hiddens: vec![32],
            output_dim: 16,
            max_degree: 0,
            sparse: false,
            seed: 42,
            use_all_supports: false,
            apply_weight_decay: false,
            use_gpu: false,
            gpu_device_id: 0,
        }
    }
}

impl TrainConfig {
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_hiddens(mut self, hiddens: Vec<usize>) -> Self {
        self.hiddens = hiddens;
        self
    }

    pub fn with_output_dim(mut self, output_dim: usize) -> Self {
        self.output_dim = output_dim;
        self
    }

    pub fn with_max_degree(mut self, max_degree: usize) -> Self {
        self.max_degree = max_degree;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_early_stopping(mut self, patience: usize) -> Self {
        self.early_stopping = patience;
        self
    }

    /// Check every range; returns all violations.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        TrainParams::from(self).resolve(self).map(|_| ())
    }

    /// Layer widths: `[input_dim] + hiddens + [output_dim]`.
    pub fn dimensions(&self, input_dim: usize) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.hiddens.len() + 2);
        dims.push(input_dim);
        dims.extend_from_slice(&self.hiddens);
        dims.push(self.output_dim);
        dims
    }

    /// Device the model's tensors live on.
    pub fn device(&self) -> Result<Device> {
        if self.use_gpu {
            Ok(Device::cuda_if_available(self.gpu_device_id)?)
        } else {
            Ok(Device::Cpu)
        }
    }
}

/// Partially specified hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainParams {
    pub lr: Option<f64>,
    pub epochs: Option<i64>,
    pub dropout: Option<f64>,
    pub weight_decay: Option<f64>,
    pub early_stopping: Option<i64>,
    pub clf_ratio: Option<f64>,
    pub hiddens: Option<Vec<i64>>,
    pub output_dim: Option<i64>,
    pub max_degree: Option<i64>,
    pub sparse: Option<bool>,
    pub seed: Option<u64>,
    pub use_all_supports: Option<bool>,
    pub apply_weight_decay: Option<bool>,
    pub use_gpu: Option<bool>,
    pub gpu_device_id: Option<usize>,
}

impl From<&TrainConfig> for TrainParams {
    fn from(c: &TrainConfig) -> Self {
        Self {
            lr: Some(c.lr),
            epochs: Some(to_i64(c.epochs)),
            dropout: Some(c.dropout),
            weight_decay: Some(c.weight_decay),
            early_stopping: Some(to_i64(c.early_stopping)),
            clf_ratio: Some(c.clf_ratio),
            hiddens: Some(c.hiddens.iter().copied().map(to_i64).collect()),
            output_dim: Some(to_i64(c.output_dim)),
            max_degree: Some(to_i64(c.max_degree)),
            sparse: Some(c.sparse),
            seed: Some(c.seed),
            use_all_supports: Some(c.use_all_supports),
            apply_weight_decay: Some(c.apply_weight_decay),
            use_gpu: Some(c.use_gpu),
            gpu_device_id: Some(c.gpu_device_id),
        }
    }
}

fn to_i64(v: usize) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl TrainParams {
    /// Load from a JSON object; unknown keys are rejected.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Field-wise `self.or(fallback)`: values set here win.
    pub fn or(self, fallback: TrainParams) -> TrainParams {
        TrainParams {
            lr: self.lr.or(fallback.lr),
            epochs: self.epochs.or(fallback.epochs),
            dropout: self.dropout.or(fallback.dropout),
            weight_decay: self.weight_decay.or(fallback.weight_decay),
            early_stopping: self.early_stopping.or(fallback.early_stopping),
            clf_ratio: self.clf_ratio.or(fallback.clf_ratio),
            hiddens: self.hiddens.or(fallback.hiddens),
            output_dim: self.output_dim.or(fallback.output_dim),
            max_degree: self.max_degree.or(fallback.max_degree),
            sparse: self.sparse.or(fallback.sparse),
            seed: self.seed.or(fallback.seed),
            use_all_supports: self.use_all_supports.or(fallback.use_all_supports),
            apply_weight_decay: self.apply_weight_decay.or(fallback.apply_weight_decay),
            use_gpu: self.use_gpu.or(fallback.use_gpu),
            gpu_device_id: self.gpu_device_id.or(fallback.gpu_device_id),
        }
    }

    /// Fill gaps from `defaults`, then check every constraint.
    pub fn resolve(&self, defaults: &TrainConfig) -> std::result::Result<TrainConfig, ConfigError> {
        let mut check = Checker::default();

        let lr = self.lr.unwrap_or(defaults.lr);
        check.open("lr", lr, 0.0, f64::INFINITY);

        let epochs = self.epochs.unwrap_or(to_i64(defaults.epochs));
        check.positive("epochs", epochs);

        let dropout = self.dropout.unwrap_or(defaults.dropout);
        check.closed("dropout", dropout, 0.0, 1.0);

        let weight_decay = self.weight_decay.unwrap_or(defaults.weight_decay);
        check.open("weight_decay", weight_decay, 0.0, 1.0);

        let early_stopping = self.early_stopping.unwrap_or(to_i64(defaults.early_stopping));
        check.positive("early_stopping", early_stopping);

        let clf_ratio = self.clf_ratio.unwrap_or(defaults.clf_ratio);
        check.open("clf_ratio", clf_ratio, 0.0, 1.0);

        let max_degree = self.max_degree.unwrap_or(to_i64(defaults.max_degree));
        check.non_negative("max_degree", max_degree);

        let output_dim = self.output_dim.unwrap_or(to_i64(defaults.output_dim));
        check.positive("output_dim", output_dim);

        let hiddens = self
            .hiddens
            .clone()
            .unwrap_or_else(|| defaults.hiddens.iter().copied().map(to_i64).collect());
        if let Some(bad) = hiddens.iter().find(|&&h| h <= 0) {
            check.fail("hiddens", format!("layer size {bad} must be > 0"));
        }

        check.finish()?;

        Ok(TrainConfig {
            lr,
            epochs: epochs as usize,
            dropout,
            weight_decay,
            early_stopping: early_stopping as usize,
            clf_ratio,
            hiddens: hiddens.into_iter().map(|h| h as usize).collect(),
            output_dim: output_dim as usize,
            max_degree: max_degree as usize,
            sparse: self.sparse.unwrap_or(defaults.sparse),
            seed: self.seed.unwrap_or(defaults.seed),
            use_all_supports: self.use_all_supports.unwrap_or(defaults.use_all_supports),
            apply_weight_decay: self.apply_weight_decay.unwrap_or(defaults.apply_weight_decay),
            use_gpu: self.use_gpu.unwrap_or(defaults.use_gpu),
            gpu_device_id: self.gpu_device_id.unwrap_or(defaults.gpu_device_id),
        })
    }
}

/// Accumulates violations across all checks.
#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: String) {
        self.violations.push(Violation { field, message });
    }

    /// `lo < v < hi`; NaN always fails.
    fn open(&mut self, field: &'static str, v: f64, lo: f64, hi: f64) {
        if !(v > lo && v < hi) {
            self.fail(field, format!("{v} is out of range ({lo}, {hi})"));
        }
    }

    /// `lo <= v <= hi`; NaN always fails.
    fn closed(&mut self, field: &'static str, v: f64, lo: f64, hi: f64) {
        if !(v >= lo && v <= hi) {
            self.fail(field, format!("{v} is out of range [{lo}, {hi}]"));
        }
    }

    fn positive(&mut self, field: &'static str, v: i64) {
        if v <= 0 {
            self.fail(field, format!("{v} is out of range (0, inf)"));
        }
    }

    fn non_negative(&mut self, field: &'static str, v: i64) {
        if v < 0 {
            self.fail(field, format!("{v} is out of range [0, inf)"));
        }
    }

    fn finish(self) -> std::result::Result<(), ConfigError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError {
                violations: self.violations,
            })
        }
    }
}
