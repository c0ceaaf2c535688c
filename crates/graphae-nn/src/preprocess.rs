//! Graph preprocessing: features, propagation operators and loss weights.
//!
//! Everything here is computed once per `build` on the CPU in `f64`, then
//! handed to [`GraphTensors`](crate::tensors::GraphTensors) for staging.
//!
//! # Propagation operators
//!
//! With `max_degree == 0` the single operator is the renormalized adjacency
//!
//! ```text
//! Â = D^{-1/2} (A + I) D^{-1/2},   D = diag(rowsum(A + I))
//! ```
//!
//! With `max_degree == k > 0` the operators are the Chebyshev polynomials
//! `T_0 .. T_k` of the scaled Laplacian:
//!
//! ```text
//! L   = I - D^{-1/2} A D^{-1/2}        (isolated nodes: D^{-1/2} = 0)
//! L~  = 2 L / lambda_max - I
//! T_0 = I,  T_1 = L~,  T_k = 2 L~ T_{k-1} - T_{k-2}
//! ```

use crate::error::{Error, Result};
use graphae_core::GraphView;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use tracing::debug;

const POWER_ITERATION_MAX_STEPS: usize = 10_000;
const POWER_ITERATION_TOL: f64 = 1e-12;
const POWER_ITERATION_SEED: u64 = 0x5eed;

/// Node feature matrix, dense or CSR. Values are identical either way.
#[derive(Debug, Clone)]
pub enum FeatureMatrix {
    Dense(Array2<f64>),
    Sparse(CsMat<f64>),
}

impl FeatureMatrix {
    /// `(rows, cols)`.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            FeatureMatrix::Dense(m) => m.dim(),
            FeatureMatrix::Sparse(m) => (m.rows(), m.cols()),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureMatrix::Sparse(_))
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            FeatureMatrix::Dense(m) => m.clone(),
            FeatureMatrix::Sparse(m) => m.to_dense(),
        }
    }
}

/// Multi-hot node labels for downstream evaluation.
#[derive(Debug, Clone, Default)]
pub struct LabelMatrix {
    /// N x L, 1.0 where the node carries the label.
    pub matrix: Array2<f32>,
    /// label -> column
    pub label_index: HashMap<String, usize>,
    /// column -> label
    pub labels: Vec<String>,
}

impl LabelMatrix {
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Output of [`preprocess`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Row-normalized node features.
    pub features: FeatureMatrix,
    /// Reconstruction target `A + I`, dense.
    pub adj_label: Array2<f64>,
    /// Propagation operators, one or `max_degree + 1`.
    pub supports: Vec<CsMat<f64>>,
    /// Weight on positive entries of the reconstruction loss.
    pub pos_weight: f64,
    /// Normalizer of the reconstruction loss.
    pub norm: f64,
    pub labels: LabelMatrix,
    /// Sum of `A` (each undirected edge counted twice).
    pub edge_mass: f64,
}

impl Preprocessed {
    pub fn num_nodes(&self) -> usize {
        self.adj_label.nrows()
    }
}

/// Turn a graph into model inputs.
///
/// # Errors
///
/// - [`Error::DegenerateGraph`] when the graph has no edges (checked first).
/// - [`Error::Graph`] when some node has no features.
pub fn preprocess<G: GraphView + ?Sized>(graph: &G, max_degree: usize, sparse: bool) -> Result<Preprocessed> {
    let adj = graph.adjacency(false, false);
    let n = adj.rows();
    let edge_mass: f64 = adj.data().iter().sum();
    if edge_mass <= 0.0 {
        return Err(Error::DegenerateGraph(format!(
            "graph with {n} nodes has no edges"
        )));
    }

    let features = row_normalize(&graph.features()?);
    let features = if sparse {
        FeatureMatrix::Sparse(dense_to_csr(&features))
    } else {
        FeatureMatrix::Dense(features)
    };

    let mut adj_label = adj.to_dense();
    adj_label.diag_mut().fill(1.0);

    let supports = if max_degree == 0 {
        vec![normalize_adjacency(&adj)]
    } else {
        chebyshev_polynomials(&adj, max_degree)?
    };

    let (pos_weight, norm) = class_weights(n, edge_mass);
    let labels = build_label_matrix(graph);

    debug!(
        nodes = n,
        edge_mass,
        supports = supports.len(),
        pos_weight,
        norm,
        labels = labels.num_labels(),
        "preprocessed graph"
    );

    Ok(Preprocessed {
        features,
        adj_label,
        supports,
        pos_weight,
        norm,
        labels,
        edge_mass,
    })
}

/// `(pos_weight, norm)` for `n` nodes and adjacency sum `edge_mass`.
///
/// ```text
/// pos_weight = (n^2 - edge_mass) / edge_mass
/// norm       = n^2 / (2 (n^2 - edge_mass))
/// ```
pub fn class_weights(n: usize, edge_mass: f64) -> (f64, f64) {
    let total = (n * n) as f64;
    let negatives = total - edge_mass;
    (negatives / edge_mass, total / (2.0 * negatives))
}

/// Renormalized adjacency `D^{-1/2} (A + I) D^{-1/2}`.
pub fn normalize_adjacency(adj: &CsMat<f64>) -> CsMat<f64> {
    let with_loops = add_identity(adj, 1.0);
    let d_inv_sqrt = degree_inv_sqrt(&with_loops);
    scale_symmetric(&with_loops, &d_inv_sqrt)
}

/// Scaled Laplacian `2 L / lambda_max - I`.
///
/// # Errors
///
/// [`Error::DegenerateGraph`] if the largest eigenvalue of `L` is not positive.
pub fn scaled_laplacian(adj: &CsMat<f64>) -> Result<CsMat<f64>> {
    let d_inv_sqrt = degree_inv_sqrt(adj);
    let normalized = scale_symmetric(adj, &d_inv_sqrt);
    let n = adj.rows();
    let laplacian = lin_comb(&CsMat::eye(n), 1.0, &normalized, -1.0);

    let lambda = largest_eigenvalue(&laplacian);
    if !(lambda > 0.0) {
        return Err(Error::DegenerateGraph(format!(
            "laplacian has largest eigenvalue {lambda}"
        )));
    }
    debug!(lambda_max = lambda, "scaled laplacian");
    Ok(lin_comb(&laplacian, 2.0 / lambda, &CsMat::eye(n), -1.0))
}

/// Chebyshev operators `T_0 .. T_k` of the scaled Laplacian of `adj`.
pub fn chebyshev_polynomials(adj: &CsMat<f64>, k: usize) -> Result<Vec<CsMat<f64>>> {
    let n = adj.rows();
    let scaled = scaled_laplacian(adj)?;

    let mut t: Vec<CsMat<f64>> = vec![CsMat::eye(n), scaled.clone()];
    for i in 2..=k {
        let product: CsMat<f64> = &scaled * &t[i - 1];
        let next = lin_comb(&product, 2.0, &t[i - 2], -1.0);
        t.push(next);
    }
    t.truncate(k + 1);
    Ok(t)
}

/// Largest eigenvalue of a symmetric matrix by power iteration.
///
/// Starts from a fixed-seed random vector and stops once the Rayleigh
/// quotient changes by less than a relative `1e-12`. Returns 0 for a matrix
/// that maps the iterate to zero.
pub fn largest_eigenvalue(m: &CsMat<f64>) -> f64 {
    let n = m.rows();
    if n == 0 {
        return 0.0;
    }

    let mut rng = XorShiftRng::seed_from_u64(POWER_ITERATION_SEED);
    let mut x: Array1<f64> = (0..n).map(|_| rng.gen_range(0.5..1.5)).collect();
    normalize_vec(&mut x);

    let mut lambda = 0.0;
    for _ in 0..POWER_ITERATION_MAX_STEPS {
        let y = spmv(m, &x);
        let next = x.dot(&y);
        let norm = y.dot(&y).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        x = y / norm;
        if (next - lambda).abs() <= POWER_ITERATION_TOL * next.abs().max(1.0) {
            return next;
        }
        lambda = next;
    }
    lambda
}

/// Divide each row by its sum; zero-sum rows stay zero.
pub fn row_normalize(features: &Array2<f64>) -> Array2<f64> {
    let mut out = features.clone();
    for mut row in out.rows_mut() {
        let sum: f64 = row.sum();
        if sum == 0.0 {
            row.fill(0.0);
        } else {
            row.mapv_inplace(|v| v / sum);
        }
    }
    out
}

/// Multi-hot label matrix. Columns are assigned in first-seen order over
/// nodes in index order.
pub fn build_label_matrix<G: GraphView + ?Sized>(graph: &G) -> LabelMatrix {
    let n = graph.node_count();
    let mut label_index: HashMap<String, usize> = HashMap::new();
    let mut labels: Vec<String> = Vec::new();
    let mut hits: Vec<(usize, usize)> = Vec::new();

    for node in 0..n {
        for label in graph.node_labels(node) {
            let col = *label_index.entry(label.clone()).or_insert_with(|| {
                labels.push(label.clone());
                labels.len() - 1
            });
            hits.push((node, col));
        }
    }

    let mut matrix = Array2::zeros((n, labels.len()));
    for (row, col) in hits {
        matrix[[row, col]] = 1.0;
    }

    LabelMatrix {
        matrix,
        label_index,
        labels,
    }
}

fn normalize_vec(x: &mut Array1<f64>) {
    let norm = x.dot(x).sqrt();
    if norm > 0.0 {
        x.mapv_inplace(|v| v / norm);
    }
}

fn spmv(m: &CsMat<f64>, x: &Array1<f64>) -> Array1<f64> {
    let mut y = Array1::zeros(m.rows());
    for (&v, (i, j)) in m.iter() {
        y[i] += v * x[j];
    }
    y
}

/// `D^{-1/2}` of the row sums; zero-degree rows get 0.
fn degree_inv_sqrt(m: &CsMat<f64>) -> Vec<f64> {
    let mut degree = vec![0.0; m.rows()];
    for (&v, (i, _)) in m.iter() {
        degree[i] += v;
    }
    degree
        .into_iter()
        .map(|d| if d > 0.0 { d.powf(-0.5) } else { 0.0 })
        .collect()
}

/// `diag(s) M diag(s)`.
fn scale_symmetric(m: &CsMat<f64>, s: &[f64]) -> CsMat<f64> {
    let mut tri = TriMat::with_capacity((m.rows(), m.cols()), m.nnz());
    for (&v, (i, j)) in m.iter() {
        let scaled = v * s[i] * s[j];
        if scaled != 0.0 {
            tri.add_triplet(i, j, scaled);
        }
    }
    tri.to_csr()
}

/// `M + alpha I`.
fn add_identity(m: &CsMat<f64>, alpha: f64) -> CsMat<f64> {
    lin_comb(m, 1.0, &CsMat::eye(m.rows()), alpha)
}

/// `alpha A + beta B`; duplicates are summed by the triplet conversion.
fn lin_comb(a: &CsMat<f64>, alpha: f64, b: &CsMat<f64>, beta: f64) -> CsMat<f64> {
    let mut tri = TriMat::with_capacity((a.rows(), a.cols()), a.nnz() + b.nnz());
    for (&v, (i, j)) in a.iter() {
        tri.add_triplet(i, j, alpha * v);
    }
    for (&v, (i, j)) in b.iter() {
        tri.add_triplet(i, j, beta * v);
    }
    tri.to_csr()
}

fn dense_to_csr(m: &Array2<f64>) -> CsMat<f64> {
    let mut tri = TriMat::new(m.dim());
    for ((i, j), &v) in m.indexed_iter() {
        if v != 0.0 {
            tri.add_triplet(i, j, v);
        }
    }
    tri.to_csr()
}
