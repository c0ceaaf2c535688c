//! Graph autoencoders on attributed graphs.
//!
//! `graphae-nn` turns an attributed graph into node embeddings with a graph
//! autoencoder (GAE) or its variational form (VGAE). It sits between the
//! structure layer (`graphae-core`) and application code.
//!
//! # Modules
//!
//! - [`preprocess`]: feature normalization, propagation operators, loss weights
//! - [`conv`]: graph convolution layer
//! - [`encoder`]: GAE / VGAE encoders
//! - [`loss`]: weighted reconstruction loss and KL term
//! - [`model`]: the `build` / `train_model` / `get_embeddings` lifecycle
//! - [`training`]: epoch loop with early stopping
//! - [`config`]: hyperparameters and their validation
//! - [`export`]: embedding text files
//!
//! # Example: step-by-step training
//!
//! ```rust,ignore
//! use graphae_core::AttributedGraph;
//! use graphae_nn::{GraphAutoencoder, ModelKind, TrainParams};
//!
//! let mut graph = AttributedGraph::from_edgelist_file("cora.edges", false, false)?;
//! graph.load_features_file("cora.features")?;
//!
//! let config = ModelKind::Gae.check_train_parameters(&TrainParams::default())?;
//! let mut model = GraphAutoencoder::gae();
//! model.build(&graph, config)?;
//! for _ in 0..200 {
//!     model.train_model()?;
//!     println!("{}", model.debug_info());
//! }
//! let embeddings = model.get_embeddings()?;  // (N, 16)
//! ```

pub mod config;
pub mod conv;
pub mod encoder;
pub mod error;
pub mod export;
pub mod loss;
pub mod model;
pub mod preprocess;
pub mod tensors;
pub mod training;

pub use config::{ModelKind, TrainConfig, TrainParams};
pub use encoder::{EncoderOutput, GraphEncoder};
pub use error::{ConfigError, Error, Result, Violation};
pub use model::{GraphAutoencoder, ModelState, StepOutput};
pub use preprocess::{preprocess, Preprocessed};
pub use tensors::GraphTensors;
pub use training::{fit, fit_with_callback, TrainingResult};
