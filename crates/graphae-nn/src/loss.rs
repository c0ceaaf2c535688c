//! Reconstruction and KL losses.
//!
//! The decoder is the inner product `z zᵀ`, scored against `A + I` with a
//! positively weighted binary cross entropy. Memory and compute are O(N²).

use crate::encoder::EncoderOutput;
use crate::error::Result;
use crate::tensors::GraphTensors;
use candle_core::Tensor;

/// Mean of `BCEWithLogits(logits, targets)` with positives weighted by
/// `pos_weight`, in the overflow-free form
///
/// ```text
/// (1 - y) x + (1 + (pw - 1) y) (log(1 + e^{-|x|}) + max(-x, 0))
/// ```
pub fn weighted_bce_with_logits(logits: &Tensor, targets: &Tensor, pos_weight: f64) -> Result<Tensor> {
    let negative_part = targets.affine(-1.0, 1.0)?.mul(logits)?;
    let log_weight = targets.affine(pos_weight - 1.0, 1.0)?;
    let softplus = logits
        .abs()?
        .neg()?
        .exp()?
        .affine(1.0, 1.0)?
        .log()?
        .add(&logits.neg()?.relu()?)?;
    Ok(negative_part.add(&log_weight.mul(&softplus)?)?.mean_all()?)
}

/// `norm * weighted_bce(z zᵀ, adj_label)`.
pub fn reconstruction_loss(z: &Tensor, adj_label: &Tensor, pos_weight: f64, norm: f64) -> Result<Tensor> {
    let logits = z.matmul(&z.t()?)?;
    Ok(weighted_bce_with_logits(&logits, adj_label, pos_weight)?.affine(norm, 0.0)?)
}

/// `-0.5 / n * mean_rows( sum_dim(1 + 2 logvar - mu² - exp(logvar)²) )`.
///
/// Zero at `mu = 0, logvar = 0`.
pub fn kl_divergence(mu: &Tensor, logvar: &Tensor, n: usize) -> Result<Tensor> {
    let inner = logvar
        .affine(2.0, 1.0)?
        .sub(&mu.sqr()?)?
        .sub(&logvar.exp()?.sqr()?)?;
    Ok(inner.sum(1)?.mean_all()?.affine(-0.5 / n as f64, 0.0)?)
}

/// Reconstruction loss of `z`, plus the KL term when the encoder is variational.
pub fn autoencoder_loss(output: &EncoderOutput, inputs: &GraphTensors) -> Result<Tensor> {
    let recon = reconstruction_loss(&output.z, &inputs.adj_label, inputs.pos_weight, inputs.norm)?;
    match &output.logvar {
        Some(logvar) => Ok(recon.add(&kl_divergence(&output.mu, logvar, inputs.n_nodes)?)?),
        None => Ok(recon),
    }
}
