//! Graph convolution layer.
//!
//! ```text
//! H' = act( sum_i S_i · (dropout(H) · W_i) )
//! ```
//!
//! Where:
//! - `S_i` are the propagation operators (renormalized adjacency or
//!   Chebyshev terms), supplied at forward time
//! - `H` is the node feature matrix (N x in_features)
//! - `W_i` is one learnable weight per operator, no bias
//!
//! # Reference
//!
//! Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
//! Networks", ICLR 2017.

use crate::error::{Error, Result};
use candle_core::{Device, Tensor, Var};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rand_xorshift::XorShiftRng;

/// Nonlinearity applied after propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Identity,
}

impl Activation {
    fn apply(self, x: Tensor) -> Result<Tensor> {
        match self {
            Activation::Relu => Ok(x.relu()?),
            Activation::Identity => Ok(x),
        }
    }
}

/// Graph convolution with one weight per propagation operator.
#[derive(Debug)]
pub struct GraphConvolution {
    weights: Vec<Var>,
    in_features: usize,
    out_features: usize,
    dropout: f64,
    activation: Activation,
}

impl GraphConvolution {
    /// Create a layer with Xavier-uniform weights drawn from `rng`.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `num_supports`: Number of operators this layer propagates over (>= 1)
    /// - `dropout`: Input dropout rate, used in training mode only
    /// - `activation`: Output nonlinearity
    pub fn new(
        in_features: usize,
        out_features: usize,
        num_supports: usize,
        dropout: f64,
        activation: Activation,
        rng: &mut XorShiftRng,
        device: &Device,
    ) -> Result<Self> {
        // Weights come from the model's own seeded rng rather than a
        // VarBuilder: candle's CPU generator is process-wide and cannot be
        // seeded per model.
        let weights = (0..num_supports.max(1))
            .map(|_| -> Result<Var> {
                let w = xavier_uniform(in_features, out_features, rng, device)?;
                Ok(Var::from_tensor(&w)?)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            weights,
            in_features,
            out_features,
            dropout,
            activation,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `supports`: Operators (N x N); the first `num_supports` are used
    /// - `train`: Enables dropout
    ///
    /// # Returns
    /// - Node representations (N x out_features)
    pub fn forward(&self, x: &Tensor, supports: &[Tensor], train: bool, rng: &mut XorShiftRng) -> Result<Tensor> {
        if supports.len() < self.weights.len() {
            return Err(Error::DimensionMismatch {
                expected: self.weights.len(),
                got: supports.len(),
            });
        }

        let x = if train { dropout(x, self.dropout, rng)? } else { x.clone() };

        let mut out: Option<Tensor> = None;
        for (w, support) in self.weights.iter().zip(supports) {
            let h = support.matmul(&x.matmul(w.as_tensor())?)?;
            out = Some(match out {
                None => h,
                Some(acc) => acc.add(&h)?,
            });
        }

        // weights is never empty
        let out = out.ok_or(Error::DimensionMismatch { expected: 1, got: 0 })?;
        self.activation.apply(out)
    }

    /// Trainable parameters.
    pub fn vars(&self) -> Vec<Var> {
        self.weights.clone()
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn num_supports(&self) -> usize {
        self.weights.len()
    }
}

/// `in x out` matrix with entries uniform in `±sqrt(6 / (in + out))`.
pub fn xavier_uniform(in_features: usize, out_features: usize, rng: &mut XorShiftRng, device: &Device) -> Result<Tensor> {
    let bound = (6.0 / (in_features + out_features) as f64).sqrt() as f32;
    let dist = Uniform::new_inclusive(-bound, bound);
    let data: Vec<f32> = (0..in_features * out_features)
        .map(|_| dist.sample(rng))
        .collect();
    Ok(Tensor::from_vec(data, (in_features, out_features), device)?)
}

/// Inverted dropout: keep with probability `1 - p`, scale kept entries by
/// `1 / (1 - p)`. `p >= 1` zeroes the input.
pub fn dropout(x: &Tensor, p: f64, rng: &mut XorShiftRng) -> Result<Tensor> {
    if p <= 0.0 {
        return Ok(x.clone());
    }
    if p >= 1.0 {
        return Ok(x.zeros_like()?);
    }

    let scale = (1.0 / (1.0 - p)) as f32;
    let mask: Vec<f32> = (0..x.elem_count())
        .map(|_| if rng.gen::<f64>() < p { 0.0 } else { scale })
        .collect();
    let mask = Tensor::from_vec(mask, x.dims().to_vec(), x.device())?.to_dtype(x.dtype())?;
    Ok(x.mul(&mask)?)
}
