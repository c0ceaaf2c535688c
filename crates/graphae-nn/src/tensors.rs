//! Device-resident model inputs.
//!
//! [`GraphTensors`] owns every fixed tensor a model reads during training:
//! features, operators, reconstruction target and labels. Moving a model to
//! another device is an explicit [`GraphTensors::to_device`] call.

use crate::error::Result;
use crate::preprocess::Preprocessed;
use candle_core::{Device, Tensor};
use ndarray::Array2;
use sprs::CsMat;

/// Fixed inputs of one graph, as `f32` tensors.
#[derive(Debug, Clone)]
pub struct GraphTensors {
    /// N x F, row-normalized.
    pub features: Tensor,
    /// N x N, `A + I`.
    pub adj_label: Tensor,
    /// Propagation operators, N x N each.
    pub supports: Vec<Tensor>,
    /// N x L multi-hot labels; `None` when the graph has no labels.
    pub labels: Option<Tensor>,
    pub pos_weight: f64,
    pub norm: f64,
    pub n_nodes: usize,
}

impl GraphTensors {
    /// Stage preprocessed matrices on `device`.
    pub fn from_preprocessed(p: &Preprocessed, device: &Device) -> Result<Self> {
        let features = dense_tensor(&p.features.to_dense(), device)?;
        let adj_label = dense_tensor(&p.adj_label, device)?;
        let supports = p
            .supports
            .iter()
            .map(|s| sparse_tensor(s, device))
            .collect::<Result<Vec<_>>>()?;
        let labels = if p.labels.is_empty() {
            None
        } else {
            let (rows, cols) = p.labels.matrix.dim();
            let data: Vec<f32> = p.labels.matrix.iter().copied().collect();
            Some(Tensor::from_vec(data, (rows, cols), device)?)
        };

        Ok(Self {
            features,
            adj_label,
            supports,
            labels,
            pos_weight: p.pos_weight,
            norm: p.norm,
            n_nodes: p.num_nodes(),
        })
    }

    /// Copy every tensor to `device`.
    pub fn to_device(&self, device: &Device) -> Result<Self> {
        Ok(Self {
            features: self.features.to_device(device)?,
            adj_label: self.adj_label.to_device(device)?,
            supports: self
                .supports
                .iter()
                .map(|s| s.to_device(device))
                .collect::<candle_core::Result<Vec<_>>>()?,
            labels: self
                .labels
                .as_ref()
                .map(|l| l.to_device(device))
                .transpose()?,
            pos_weight: self.pos_weight,
            norm: self.norm,
            n_nodes: self.n_nodes,
        })
    }

    pub fn input_dim(&self) -> Result<usize> {
        Ok(self.features.dim(1)?)
    }

    pub fn device(&self) -> &Device {
        self.features.device()
    }
}

fn dense_tensor(m: &Array2<f64>, device: &Device) -> Result<Tensor> {
    let data: Vec<f32> = m.iter().map(|&v| v as f32).collect();
    Ok(Tensor::from_vec(data, m.dim(), device)?)
}

/// Candle has no sparse storage; operators are densified here.
fn sparse_tensor(m: &CsMat<f64>, device: &Device) -> Result<Tensor> {
    let cols = m.cols();
    let mut data = vec![0f32; m.rows() * cols];
    for (&v, (i, j)) in m.iter() {
        data[i * cols + j] = v as f32;
    }
    Ok(Tensor::from_vec(data, (m.rows(), cols), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;
    use graphae_core::AttributedGraph;

    fn triangle() -> AttributedGraph {
        let mut g = AttributedGraph::new(false);
        g.add_edge("a", "b", 1.0);
        g.add_edge("b", "c", 1.0);
        g.add_edge("c", "a", 1.0);
        for id in ["a", "b", "c"] {
            g.set_features(id, vec![1.0, 1.0]).unwrap();
        }
        g.add_label("a", "x").unwrap();
        g
    }

    #[test]
    fn test_shapes() {
        let p = preprocess(&triangle(), 2, false).unwrap();
        let t = GraphTensors::from_preprocessed(&p, &Device::Cpu).unwrap();
        assert_eq!(t.features.dims(), &[3, 2]);
        assert_eq!(t.adj_label.dims(), &[3, 3]);
        assert_eq!(t.supports.len(), 3);
        assert_eq!(t.labels.as_ref().unwrap().dims(), &[3, 1]);
        assert_eq!(t.n_nodes, 3);
        assert_eq!(t.input_dim().unwrap(), 2);
    }

    #[test]
    fn test_values_survive_conversion() {
        let p = preprocess(&triangle(), 0, true).unwrap();
        let t = GraphTensors::from_preprocessed(&p, &Device::Cpu).unwrap();
        let features = t.features.to_vec2::<f32>().unwrap();
        assert_eq!(features[0], vec![0.5, 0.5]);
        let support = t.supports[0].to_vec2::<f32>().unwrap();
        // complete graph on 3 nodes: every degree (with loop) is 3
        for row in support {
            for v in row {
                assert!((v - 1.0 / 3.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_to_device_keeps_everything() {
        let p = preprocess(&triangle(), 0, false).unwrap();
        let t = GraphTensors::from_preprocessed(&p, &Device::Cpu).unwrap();
        let moved = t.to_device(&Device::Cpu).unwrap();
        assert_eq!(moved.supports.len(), t.supports.len());
        assert_eq!(moved.pos_weight, t.pos_weight);
        assert!(moved.device().is_cpu());
    }
}
