//! Epoch loop with early stopping.
//!
//! The training loop:
//! 1. Build the model on the graph
//! 2. Call `train_model` once per epoch, recording the loss
//! 3. Stop after `epochs`, or once the loss has not improved for
//!    `early_stopping` consecutive epochs
//! 4. Extract embeddings in evaluation mode
//!
//! # Example
//!
//! ```rust,ignore
//! use graphae_nn::{fit, GraphAutoencoder, ModelKind};
//!
//! let config = ModelKind::Vgae.defaults().with_epochs(50);
//! let mut model = GraphAutoencoder::vgae();
//! let result = fit(&mut model, &graph, config)?;
//! println!("best loss {} at epoch {}", result.best_loss, result.best_epoch);
//! ```

use crate::config::TrainConfig;
use crate::error::Result;
use crate::model::{GraphAutoencoder, StepOutput};
use graphae_core::GraphView;
use std::collections::HashMap;
use tracing::{info, warn};

/// Training results.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// Node id -> embedding.
    pub embeddings: HashMap<String, Vec<f32>>,
    /// Training loss per epoch.
    pub loss_history: Vec<f32>,
    /// 1-based epoch with the lowest loss.
    pub best_epoch: usize,
    pub best_loss: f32,
    /// Whether patience ran out before `epochs`.
    pub stopped_early: bool,
}

/// Build `model` on `graph`, train, and extract embeddings.
pub fn fit<G: GraphView + ?Sized>(model: &mut GraphAutoencoder, graph: &G, config: TrainConfig) -> Result<TrainingResult> {
    fit_with_callback(model, graph, config, |_, _| {})
}

/// [`fit`], calling `on_epoch(epoch, step)` after every step.
pub fn fit_with_callback<G, F>(
    model: &mut GraphAutoencoder,
    graph: &G,
    config: TrainConfig,
    mut on_epoch: F,
) -> Result<TrainingResult>
where
    G: GraphView + ?Sized,
    F: FnMut(usize, &StepOutput),
{
    let epochs = config.epochs;
    let patience = config.early_stopping;
    model.build(graph, config)?;

    let mut loss_history = Vec::with_capacity(epochs);
    let mut best_loss = f32::INFINITY;
    let mut best_epoch = 0;
    let mut since_best = 0;
    let mut stopped_early = false;

    for epoch in 1..=epochs {
        let step = model.train_model()?;
        loss_history.push(step.loss);
        on_epoch(epoch, &step);

        if step.loss < best_loss {
            best_loss = step.loss;
            best_epoch = epoch;
            since_best = 0;
        } else {
            since_best += 1;
            if since_best >= patience {
                warn!(epoch, best_epoch, best_loss, "early stopping: no improvement for {patience} epochs");
                stopped_early = true;
                break;
            }
        }
    }

    model.get_embeddings()?;
    let embeddings = model.embedding_map()?;

    info!(
        epochs = loss_history.len(),
        best_epoch,
        best_loss,
        "training finished"
    );

    Ok(TrainingResult {
        embeddings,
        loss_history,
        best_epoch,
        best_loss,
        stopped_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::error::Error;
    use graphae_core::AttributedGraph;

    fn ring(n: usize) -> AttributedGraph {
        let mut g = AttributedGraph::new(false);
        for i in 0..n {
            g.add_edge(&i.to_string(), &((i + 1) % n).to_string(), 1.0);
        }
        for i in 0..n {
            let f = (0..3).map(|j| ((i + j) % 3) as f64).collect();
            g.set_features(&i.to_string(), f).unwrap();
        }
        g
    }

    #[test]
    fn test_fit_records_every_epoch() {
        let config = ModelKind::Gae
            .defaults()
            .with_epochs(10)
            .with_hiddens(vec![8])
            .with_output_dim(4);
        let mut model = GraphAutoencoder::gae();
        let result = fit(&mut model, &ring(6), config).unwrap();

        assert_eq!(result.loss_history.len(), 10);
        assert_eq!(result.embeddings.len(), 6);
        assert!(result.best_epoch >= 1 && result.best_epoch <= 10);
        assert_eq!(result.best_loss, result.loss_history[result.best_epoch - 1]);
        assert!(!result.stopped_early);
    }

    #[test]
    fn test_loss_decreases_with_training() {
        let config = ModelKind::Gae
            .defaults()
            .with_epochs(100)
            .with_hiddens(vec![8])
            .with_output_dim(4);
        let mut model = GraphAutoencoder::gae();
        let result = fit(&mut model, &ring(8), config).unwrap();
        assert!(result.best_loss < result.loss_history[0]);
    }

    #[test]
    fn test_callback_sees_each_epoch() {
        let config = ModelKind::Vgae
            .defaults()
            .with_epochs(4)
            .with_hiddens(vec![4])
            .with_output_dim(2);
        let mut seen = Vec::new();
        let mut model = GraphAutoencoder::vgae();
        fit_with_callback(&mut model, &ring(5), config, |epoch, step| {
            seen.push((epoch, step.loss));
        })
        .unwrap();
        assert_eq!(seen.iter().map(|(e, _)| *e).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_early_stopping_on_flat_loss() {
        // updates of size ~1e-30 vanish in f32, so the loss repeats exactly
        let config = ModelKind::Gae
            .defaults()
            .with_lr(1e-30)
            .with_epochs(500)
            .with_early_stopping(1)
            .with_hiddens(vec![4])
            .with_output_dim(2);
        let mut model = GraphAutoencoder::gae();
        let result = fit(&mut model, &ring(5), config).unwrap();
        assert!(result.stopped_early);
        assert!(result.loss_history.len() < 500);
    }

    #[test]
    fn test_fit_propagates_build_errors() {
        let mut g = AttributedGraph::new(false);
        g.add_node("a");
        g.set_features("a", vec![1.0]).unwrap();
        let mut model = GraphAutoencoder::gae();
        let err = fit(&mut model, &g, TrainConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DegenerateGraph(_)));
    }
}
