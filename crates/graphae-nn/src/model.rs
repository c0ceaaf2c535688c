//! Model lifecycle: build, train step by step, extract embeddings.
//!
//! ```text
//! Unbuilt --build--> Built --train_model--> Trained --get_embeddings--> EmbeddingExtracted
//!                      ^                                                      |
//!                      +------------------------ build -----------------------+
//! ```
//!
//! `train_model` performs exactly one optimizer step; the epoch loop lives in
//! [`fit`](crate::training::fit) or in the caller.

use crate::config::{ModelKind, TrainConfig};
use crate::encoder::{EncoderOutput, GraphEncoder};
use crate::error::{Error, Result};
use crate::loss::autoencoder_loss;
use crate::preprocess::{preprocess, LabelMatrix};
use crate::tensors::GraphTensors;
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use graphae_core::GraphView;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where a model is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unbuilt,
    Built,
    Trained,
    EmbeddingExtracted,
}

/// Result of one training step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Encoder output `z` of this step (N x output_dim).
    pub output: Tensor,
    pub loss: f32,
    pub elapsed: Duration,
}

struct Built {
    config: TrainConfig,
    tensors: GraphTensors,
    labels: LabelMatrix,
    encoder: GraphEncoder,
    optimizer: AdamW,
    rng: XorShiftRng,
    node_ids: Vec<String>,
}

/// A GAE or VGAE bound to one graph.
pub struct GraphAutoencoder {
    kind: ModelKind,
    state: ModelState,
    built: Option<Built>,
    embeddings: Option<Tensor>,
    debug_info: String,
    epoch: usize,
}

impl GraphAutoencoder {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            state: ModelState::Unbuilt,
            built: None,
            embeddings: None,
            debug_info: String::new(),
            epoch: 0,
        }
    }

    pub fn gae() -> Self {
        Self::new(ModelKind::Gae)
    }

    pub fn vgae() -> Self {
        Self::new(ModelKind::Vgae)
    }

    /// Reject graphs this model cannot train on.
    pub fn check_graphtype<G: GraphView + ?Sized>(&self, graph: &G) -> Result<()> {
        self.kind.check_graphtype(graph)
    }

    /// Preprocess `graph` and create parameters and optimizer state.
    ///
    /// Calling `build` again discards all previous state.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for invalid hyperparameters (nothing is allocated)
    /// - [`Error::UnsupportedGraph`] for graphs without features
    /// - [`Error::DegenerateGraph`] for graphs without edges
    pub fn build<G: GraphView + ?Sized>(&mut self, graph: &G, config: TrainConfig) -> Result<()> {
        config.validate()?;
        self.check_graphtype(graph)?;

        self.built = None;
        self.embeddings = None;
        self.epoch = 0;
        self.debug_info.clear();
        self.state = ModelState::Unbuilt;

        let device = config.device()?;
        let pre = preprocess(graph, config.max_degree, config.sparse)?;
        let tensors = GraphTensors::from_preprocessed(&pre, &Device::Cpu)?.to_device(&device)?;

        let dimensions = config.dimensions(tensors.input_dim()?);
        let num_supports = if config.use_all_supports {
            tensors.supports.len()
        } else {
            1
        };

        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let encoder = GraphEncoder::new(
            &dimensions,
            self.kind.is_variational(),
            config.dropout,
            num_supports,
            &mut rng,
            &device,
        )?;

        let params = ParamsAdamW {
            lr: config.lr,
            weight_decay: if config.apply_weight_decay {
                config.weight_decay
            } else {
                0.0
            },
            ..Default::default()
        };
        let optimizer = AdamW::new(encoder.vars(), params)?;

        let node_ids = (0..tensors.n_nodes)
            .map(|i| graph.look_back(i).map(str::to_string).unwrap_or_else(|| i.to_string()))
            .collect();

        info!(
            model = %self.kind,
            nodes = tensors.n_nodes,
            edges = graph.edge_count(),
            dimensions = ?dimensions,
            supports = tensors.supports.len(),
            "built graph autoencoder"
        );

        self.built = Some(Built {
            config,
            tensors,
            labels: pre.labels,
            encoder,
            optimizer,
            rng,
            node_ids,
        });
        self.state = ModelState::Built;
        Ok(())
    }

    /// Run one optimization step.
    ///
    /// # Errors
    ///
    /// - [`Error::NotBuilt`] before `build`
    /// - [`Error::TrainingDiverged`] when the loss is not finite; parameters
    ///   are left untouched
    pub fn train_model(&mut self) -> Result<StepOutput> {
        let built = self.built.as_mut().ok_or(Error::NotBuilt)?;
        let start = Instant::now();
        let epoch = self.epoch + 1;

        let output = built
            .encoder
            .forward(&built.tensors.features, &built.tensors.supports, true, &mut built.rng)?;
        let loss_tensor = autoencoder_loss(&output, &built.tensors)?;
        let loss = loss_tensor.to_scalar::<f32>()?;
        if !loss.is_finite() {
            return Err(Error::TrainingDiverged { epoch, loss });
        }

        built.optimizer.backward_step(&loss_tensor)?;
        let elapsed = start.elapsed();

        self.epoch = epoch;
        self.debug_info = format!("train_loss = {loss:.5}");
        self.state = ModelState::Trained;
        debug!(epoch, loss, elapsed_ms = elapsed.as_secs_f64() * 1e3, "train step");

        Ok(StepOutput {
            output: output.z.detach(),
            loss,
            elapsed,
        })
    }

    /// Evaluation-mode forward pass; stores and returns the embedding matrix.
    pub fn get_embeddings(&mut self) -> Result<&Tensor> {
        let built = self.built.as_mut().ok_or(Error::NotBuilt)?;
        let EncoderOutput { mu, .. } = built.encoder.forward(
            &built.tensors.features,
            &built.tensors.supports,
            false,
            &mut built.rng,
        )?;
        self.state = ModelState::EmbeddingExtracted;
        Ok(self.embeddings.insert(mu.detach()))
    }

    /// Last extracted embeddings, if any.
    pub fn embeddings(&self) -> Option<&Tensor> {
        self.embeddings.as_ref()
    }

    /// Extracted embeddings as rows of `f32`.
    pub fn embedding_rows(&self) -> Result<Vec<Vec<f32>>> {
        let emb = self.embeddings.as_ref().ok_or(Error::NotBuilt)?;
        Ok(emb.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }

    /// Node id -> embedding.
    pub fn embedding_map(&self) -> Result<HashMap<String, Vec<f32>>> {
        let rows = self.embedding_rows()?;
        Ok(self.node_ids().iter().cloned().zip(rows).collect())
    }

    /// External ids in row order.
    pub fn node_ids(&self) -> &[String] {
        self.built.as_ref().map(|b| b.node_ids.as_slice()).unwrap_or(&[])
    }

    /// Label tensor (N x L) and its dictionary. `None` before `build` or
    /// when the graph has no labels.
    pub fn labels(&self) -> Option<(&Tensor, &LabelMatrix)> {
        let built = self.built.as_ref()?;
        built.tensors.labels.as_ref().map(|t| (t, &built.labels))
    }

    /// Layer widths `[input, hidden.., output]`.
    pub fn dimensions(&self) -> &[usize] {
        self.built.as_ref().map(|b| b.encoder.dimensions()).unwrap_or(&[])
    }

    pub fn config(&self) -> Option<&TrainConfig> {
        self.built.as_ref().map(|b| &b.config)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// `"train_loss = x.xxxxx"` after the latest step.
    pub fn debug_info(&self) -> &str {
        &self.debug_info
    }

    /// Completed training steps since the last `build`.
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl ModelKind {
    /// Both models need node features.
    pub fn check_graphtype<G: GraphView + ?Sized>(self, graph: &G) -> Result<()> {
        if graph.is_attributed() {
            Ok(())
        } else {
            Err(Error::UnsupportedGraph(format!(
                "{self} requires node features on every node"
            )))
        }
    }
}

impl std::fmt::Debug for GraphAutoencoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphAutoencoder")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("dimensions", &self.dimensions())
            .field("epoch", &self.epoch)
            .finish()
    }
}
