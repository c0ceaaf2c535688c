//! End-to-end tests for the GAE / VGAE lifecycle.

use candle_core::Device;
use graphae_core::{formats, AttributedGraph, GraphView};
use graphae_nn::config::TrainParams;
use graphae_nn::preprocess::preprocess;
use graphae_nn::{export, fit, Error, GraphAutoencoder, GraphEncoder, GraphTensors, ModelKind, ModelState, TrainConfig};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::io::Cursor;

/// 0 - 1 - 2 - 3 with alternating one-hot features.
fn path_graph() -> AttributedGraph {
    let mut g = formats::read_edgelist(Cursor::new("0 1\n1 2\n2 3\n"), false, false).unwrap();
    formats::read_features(&mut g, Cursor::new("0 1 0\n1 0 1\n2 1 0\n3 0 1\n")).unwrap();
    g
}

fn path_config() -> TrainConfig {
    TrainConfig::default()
        .with_max_degree(0)
        .with_output_dim(2)
        .with_hiddens(vec![4])
        .with_epochs(1)
}

#[test]
fn gae_single_step_on_path() {
    let mut model = GraphAutoencoder::gae();
    model.build(&path_graph(), path_config()).unwrap();

    let step = model.train_model().unwrap();
    assert!(step.loss.is_finite());
    assert!(step.loss > 0.0);
    assert_eq!(step.output.dims(), &[4, 2]);
    assert!(model.debug_info().starts_with("train_loss = "));
}

#[test]
fn vgae_single_step_on_path() {
    let mut model = GraphAutoencoder::vgae();
    model.build(&path_graph(), path_config()).unwrap();

    let step = model.train_model().unwrap();
    assert!(step.loss.is_finite() && step.loss > 0.0);
    assert_eq!(model.get_embeddings().unwrap().dims(), &[4, 2]);
}

#[test]
fn negative_lr_is_named() {
    let params: TrainParams = serde_json::from_str(r#"{"lr": -0.1}"#).unwrap();
    let err = ModelKind::Gae.check_train_parameters(&params).unwrap_err();
    assert_eq!(err.fields(), vec!["lr"]);

    let err = ModelKind::Vgae.check_train_parameters(&params).unwrap_err();
    assert!(err.contains("lr"));
}

#[test]
fn zero_edge_graph_is_degenerate() {
    let mut g = AttributedGraph::new(false);
    for id in ["a", "b", "c"] {
        g.add_node(id);
        g.set_features(id, vec![1.0, 0.0]).unwrap();
    }
    assert!(matches!(preprocess(&g, 0, false), Err(Error::DegenerateGraph(_))));

    let mut model = GraphAutoencoder::gae();
    assert!(matches!(model.build(&g, path_config()), Err(Error::DegenerateGraph(_))));
    assert_eq!(model.state(), ModelState::Unbuilt);
}

#[test]
fn vgae_eval_forward_is_deterministic() {
    let mut model = GraphAutoencoder::vgae();
    model.build(&path_graph(), path_config().with_dropout(0.5)).unwrap();
    model.train_model().unwrap();

    let a = model.get_embeddings().unwrap().to_vec2::<f32>().unwrap();
    let b = model.get_embeddings().unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(a, b);
}

#[test]
fn vgae_training_forward_depends_on_noise_seed() {
    let device = Device::Cpu;
    let pre = preprocess(&path_graph(), 0, false).unwrap();
    let inputs = GraphTensors::from_preprocessed(&pre, &device).unwrap();

    let mut init = XorShiftRng::seed_from_u64(0);
    let encoder = GraphEncoder::new(&[2, 4, 2], true, 0.0, 1, &mut init, &device).unwrap();

    let a = encoder
        .forward(&inputs.features, &inputs.supports, true, &mut XorShiftRng::seed_from_u64(1))
        .unwrap();
    let b = encoder
        .forward(&inputs.features, &inputs.supports, true, &mut XorShiftRng::seed_from_u64(2))
        .unwrap();

    assert_eq!(a.mu.to_vec2::<f32>().unwrap(), b.mu.to_vec2::<f32>().unwrap());
    assert_ne!(a.z.to_vec2::<f32>().unwrap(), b.z.to_vec2::<f32>().unwrap());
}

#[test]
fn equal_seeds_reproduce_training() {
    let run = |seed: u64| {
        let mut model = GraphAutoencoder::vgae();
        let config = path_config().with_epochs(5).with_dropout(0.2).with_seed(seed);
        fit(&mut model, &path_graph(), config).unwrap().loss_history
    };
    assert_eq!(run(11), run(11));
    assert_ne!(run(11), run(12));
}

#[test]
fn chebyshev_operators_with_all_supports() {
    let mut config = path_config().with_max_degree(2);
    config.use_all_supports = true;

    let mut model = GraphAutoencoder::gae();
    model.build(&path_graph(), config).unwrap();
    let step = model.train_model().unwrap();
    assert!(step.loss.is_finite());
}

#[test]
fn chebyshev_operators_first_support_only() {
    let mut model = GraphAutoencoder::gae();
    model.build(&path_graph(), path_config().with_max_degree(3)).unwrap();
    assert!(model.train_model().unwrap().loss.is_finite());
}

#[test]
fn sparse_features_train_like_dense() {
    let dense = {
        let mut m = GraphAutoencoder::gae();
        m.build(&path_graph(), path_config()).unwrap();
        m.train_model().unwrap().loss
    };
    let sparse = {
        let mut m = GraphAutoencoder::gae();
        let mut config = path_config();
        config.sparse = true;
        m.build(&path_graph(), config).unwrap();
        m.train_model().unwrap().loss
    };
    assert_eq!(dense, sparse);
}

#[test]
fn fit_then_export() {
    let graph = path_graph();
    let mut model = GraphAutoencoder::gae();
    let result = fit(&mut model, &graph, path_config().with_epochs(20)).unwrap();
    assert_eq!(result.loss_history.len(), 20);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("emb.txt");
    export::save_embeddings(&path, &model).unwrap();

    let rows = export::load_embeddings(&path).unwrap();
    assert_eq!(rows.len(), graph.node_count());
    for (id, vector) in rows {
        assert_eq!(vector.len(), 2);
        assert_eq!(result.embeddings[&id], vector);
    }
}
