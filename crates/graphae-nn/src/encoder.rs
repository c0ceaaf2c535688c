//! Graph encoders for GAE and VGAE.
//!
//! Both variants share a trunk of ReLU graph convolutions, one per hidden
//! size. They differ in the head:
//!
//! ```text
//! GAE:   trunk -> conv(identity)              -> z
//! VGAE:  trunk -> conv(identity) -> mu
//!              -> conv(identity) -> logvar    -> z = mu + exp(logvar) * eps
//! ```
//!
//! In evaluation mode the VGAE output is `mu` exactly.

use crate::conv::{Activation, GraphConvolution};
use crate::error::{Error, Result};
use candle_core::{Device, Tensor, Var};
use rand_distr::{Distribution, StandardNormal};
use rand_xorshift::XorShiftRng;

/// Result of one encoder pass.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    /// The representation fed to the decoder.
    pub z: Tensor,
    /// Embedding matrix (equal to `z` for GAE).
    pub mu: Tensor,
    /// Log-std of the posterior (VGAE only).
    pub logvar: Option<Tensor>,
}

#[derive(Debug)]
enum Head {
    Direct(GraphConvolution),
    Variational {
        mu: GraphConvolution,
        logvar: GraphConvolution,
    },
}

/// Stack of graph convolutions ending in a plain or variational head.
#[derive(Debug)]
pub struct GraphEncoder {
    trunk: Vec<GraphConvolution>,
    head: Head,
    dimensions: Vec<usize>,
}

impl GraphEncoder {
    /// Build from a dimension list `[input, hidden.., output]`.
    ///
    /// # Arguments
    /// - `dimensions`: At least `[input, output]`
    /// - `variational`: Split the head into `mu` / `logvar`
    /// - `dropout`: Input dropout of every layer
    /// - `num_supports`: Operators per layer (1 unless multi-operator mode)
    pub fn new(
        dimensions: &[usize],
        variational: bool,
        dropout: f64,
        num_supports: usize,
        rng: &mut XorShiftRng,
        device: &Device,
    ) -> Result<Self> {
        if dimensions.len() < 2 {
            return Err(Error::DimensionMismatch {
                expected: 2,
                got: dimensions.len(),
            });
        }

        let last = dimensions.len() - 1;
        let trunk = dimensions[..last]
            .windows(2)
            .map(|w| GraphConvolution::new(w[0], w[1], num_supports, dropout, Activation::Relu, rng, device))
            .collect::<Result<Vec<_>>>()?;

        let (in_dim, out_dim) = (dimensions[last - 1], dimensions[last]);
        let head = if variational {
            Head::Variational {
                mu: GraphConvolution::new(in_dim, out_dim, num_supports, dropout, Activation::Identity, rng, device)?,
                logvar: GraphConvolution::new(in_dim, out_dim, num_supports, dropout, Activation::Identity, rng, device)?,
            }
        } else {
            Head::Direct(GraphConvolution::new(
                in_dim,
                out_dim,
                num_supports,
                dropout,
                Activation::Identity,
                rng,
                device,
            )?)
        };

        Ok(Self {
            trunk,
            head,
            dimensions: dimensions.to_vec(),
        })
    }

    /// Forward pass.
    ///
    /// With `train` set, dropout is active and VGAE samples `z`.
    pub fn forward(&self, features: &Tensor, supports: &[Tensor], train: bool, rng: &mut XorShiftRng) -> Result<EncoderOutput> {
        let mut h = features.clone();
        for layer in &self.trunk {
            h = layer.forward(&h, supports, train, rng)?;
        }

        match &self.head {
            Head::Direct(layer) => {
                let z = layer.forward(&h, supports, train, rng)?;
                Ok(EncoderOutput {
                    mu: z.clone(),
                    z,
                    logvar: None,
                })
            }
            Head::Variational { mu, logvar } => {
                let mu = mu.forward(&h, supports, train, rng)?;
                let logvar = logvar.forward(&h, supports, train, rng)?;
                let z = if train {
                    reparameterize(&mu, &logvar, rng)?
                } else {
                    mu.clone()
                };
                Ok(EncoderOutput {
                    z,
                    mu,
                    logvar: Some(logvar),
                })
            }
        }
    }

    /// All trainable parameters, trunk first.
    pub fn vars(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = self.trunk.iter().flat_map(GraphConvolution::vars).collect();
        match &self.head {
            Head::Direct(layer) => vars.extend(layer.vars()),
            Head::Variational { mu, logvar } => {
                vars.extend(mu.vars());
                vars.extend(logvar.vars());
            }
        }
        vars
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn is_variational(&self) -> bool {
        matches!(self.head, Head::Variational { .. })
    }

    pub fn num_layers(&self) -> usize {
        self.trunk.len() + 1
    }
}

/// `mu + exp(logvar) * eps` with `eps ~ N(0, 1)` drawn from `rng`.
pub fn reparameterize(mu: &Tensor, logvar: &Tensor, rng: &mut XorShiftRng) -> Result<Tensor> {
    let noise: Vec<f32> = (0..mu.elem_count())
        .map(|_| StandardNormal.sample(rng))
        .collect();
    let eps = Tensor::from_vec(noise, mu.dims().to_vec(), mu.device())?.to_dtype(mu.dtype())?;
    Ok(mu.add(&logvar.exp()?.mul(&eps)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use rand::SeedableRng;

    fn inputs(device: &Device) -> (Tensor, Vec<Tensor>) {
        let x = Tensor::new(&[[1f32, 0., 0.], [0., 1., 0.], [0., 0., 1.], [1., 1., 0.]], device).unwrap();
        let adj = Tensor::eye(4, DType::F32, device).unwrap();
        (x, vec![adj])
    }

    #[test]
    fn test_gae_shapes() {
        let device = Device::Cpu;
        let mut rng = XorShiftRng::seed_from_u64(1);
        let enc = GraphEncoder::new(&[3, 8, 4, 2], false, 0.0, 1, &mut rng, &device).unwrap();
        let (x, s) = inputs(&device);
        let out = enc.forward(&x, &s, true, &mut rng).unwrap();
        assert_eq!(out.z.dims(), &[4, 2]);
        assert!(out.logvar.is_none());
        assert_eq!(enc.num_layers(), 3);
        assert_eq!(enc.vars().len(), 3);
    }

    #[test]
    fn test_vgae_has_two_heads() {
        let device = Device::Cpu;
        let mut rng = XorShiftRng::seed_from_u64(1);
        let enc = GraphEncoder::new(&[3, 4, 2], true, 0.0, 1, &mut rng, &device).unwrap();
        assert!(enc.is_variational());
        assert_eq!(enc.vars().len(), 3);
        let (x, s) = inputs(&device);
        let out = enc.forward(&x, &s, true, &mut rng).unwrap();
        assert_eq!(out.mu.dims(), &[4, 2]);
        assert_eq!(out.logvar.unwrap().dims(), &[4, 2]);
    }

    #[test]
    fn test_vgae_eval_is_deterministic() {
        let device = Device::Cpu;
        let mut rng = XorShiftRng::seed_from_u64(3);
        let enc = GraphEncoder::new(&[3, 4, 2], true, 0.5, 1, &mut rng, &device).unwrap();
        let (x, s) = inputs(&device);
        let a = enc.forward(&x, &s, false, &mut rng).unwrap();
        let b = enc.forward(&x, &s, false, &mut rng).unwrap();
        assert_eq!(a.z.to_vec2::<f32>().unwrap(), b.z.to_vec2::<f32>().unwrap());
        assert_eq!(a.z.to_vec2::<f32>().unwrap(), a.mu.to_vec2::<f32>().unwrap());
    }

    #[test]
    fn test_vgae_training_samples() {
        let device = Device::Cpu;
        let mut rng = XorShiftRng::seed_from_u64(3);
        let enc = GraphEncoder::new(&[3, 4, 2], true, 0.0, 1, &mut rng, &device).unwrap();
        let (x, s) = inputs(&device);
        let a = enc.forward(&x, &s, true, &mut rng).unwrap();
        let b = enc.forward(&x, &s, true, &mut rng).unwrap();
        assert_ne!(a.z.to_vec2::<f32>().unwrap(), b.z.to_vec2::<f32>().unwrap());
    }

    #[test]
    fn test_reparameterize_zero_scale_noise() {
        let device = Device::Cpu;
        let mut rng = XorShiftRng::seed_from_u64(0);
        let mu = Tensor::new(&[[1f32, 2.]], &device).unwrap();
        // exp(-100) underflows to 0 in f32
        let logvar = Tensor::new(&[[-100f32, -100.]], &device).unwrap();
        let z = reparameterize(&mu, &logvar, &mut rng).unwrap();
        assert_eq!(z.to_vec2::<f32>().unwrap(), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_needs_two_dimensions() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        assert!(GraphEncoder::new(&[3], false, 0.0, 1, &mut rng, &Device::Cpu).is_err());
    }
}
