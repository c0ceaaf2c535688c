//! Property-based tests for graph preprocessing.
//!
//! These tests verify invariants that should hold for any graph with at
//! least one edge:
//! - Operator symmetry and spectrum bounds
//! - Degree round-trip of the renormalized adjacency
//! - Chebyshev recurrence
//! - Class-weight identity

use graphae_core::sprs::{CsMat, TriMat};
use graphae_core::{AttributedGraph, GraphView};
use graphae_nn::preprocess::{chebyshev_polynomials, class_weights, largest_eigenvalue, normalize_adjacency, preprocess, scaled_laplacian};
use ndarray::Array2;
use proptest::prelude::*;

/// Undirected graph on `n` nodes from `(u, v)` pairs, self-loops dropped.
fn build_graph(n: usize, pairs: &[(usize, usize)]) -> AttributedGraph {
    let mut g = AttributedGraph::new(false);
    for i in 0..n {
        g.add_node(&i.to_string());
    }
    for &(u, v) in pairs {
        let (u, v) = (u % n, v % n);
        if u != v {
            g.add_edge(&u.to_string(), &v.to_string(), 1.0);
        }
    }
    for i in 0..n {
        g.set_features(&i.to_string(), vec![1.0, (i % 3) as f64]).unwrap();
    }
    g
}

/// At least one non-loop edge on 2..12 nodes.
fn arb_graph() -> impl Strategy<Value = AttributedGraph> {
    (2usize..12)
        .prop_flat_map(|n| (Just(n), 0..n, 1..n, prop::collection::vec((0..n, 0..n), 0..30)))
        .prop_map(|(n, u, offset, mut pairs)| {
            pairs.push((u, (u + offset) % n));
            build_graph(n, &pairs)
        })
}

fn dense_to_csr(m: &Array2<f64>) -> CsMat<f64> {
    let mut tri = TriMat::new((m.nrows(), m.ncols()));
    for ((i, j), &v) in m.indexed_iter() {
        if v != 0.0 {
            tri.add_triplet(i, j, v);
        }
    }
    tri.to_csr()
}

fn assert_symmetric(m: &Array2<f64>) -> Result<(), TestCaseError> {
    for ((i, j), v) in m.indexed_iter() {
        prop_assert!((v - m[[j, i]]).abs() < 1e-12, "asymmetric at ({}, {})", i, j);
    }
    Ok(())
}

mod operator_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn renormalized_adjacency_is_symmetric_with_unit_spectrum(g in arb_graph()) {
            let op = normalize_adjacency(&g.adjacency(false, false));
            assert_symmetric(&op.to_dense())?;

            let lambda = largest_eigenvalue(&op);
            prop_assert!(lambda <= 1.0 + 1e-6, "lambda_max = {}", lambda);
            prop_assert!(lambda >= -1.0 - 1e-6, "lambda_max = {}", lambda);
        }

        #[test]
        fn degree_round_trip_recovers_adjacency(g in arb_graph()) {
            let adj = g.adjacency(false, false).to_dense();
            let n = adj.nrows();
            let with_loops = &adj + &Array2::<f64>::eye(n);
            let degree: Vec<f64> = with_loops.rows().into_iter().map(|r| r.sum()).collect();

            let op = normalize_adjacency(&g.adjacency(false, false)).to_dense();
            for ((i, j), v) in op.indexed_iter() {
                let restored = v * degree[i].sqrt() * degree[j].sqrt();
                prop_assert!((restored - with_loops[[i, j]]).abs() < 1e-9);
            }
        }

        #[test]
        fn scaled_laplacian_spectrum_in_unit_interval(g in arb_graph()) {
            let scaled = scaled_laplacian(&g.adjacency(false, false)).unwrap().to_dense();
            assert_symmetric(&scaled)?;
            let n = scaled.nrows();
            let eye = Array2::<f64>::eye(n);

            // L~ + I and I - L~ are positive semidefinite with spectrum in [0, 2]
            // exactly when the spectrum of L~ lies in [-1, 1].
            let upper = largest_eigenvalue(&dense_to_csr(&(&scaled + &eye)));
            prop_assert!(upper <= 2.0 + 1e-6, "lambda_max(L~ + I) = {}", upper);
            prop_assert!(upper > 0.0, "lambda_max(L~ + I) = {}", upper);

            let lower = largest_eigenvalue(&dense_to_csr(&(&eye - &scaled)));
            prop_assert!(lower <= 2.0 + 1e-6, "lambda_max(I - L~) = {}", lower);

            let trace = scaled.diag().sum();
            prop_assert!(trace.is_finite(), "trace = {}", trace);
            prop_assert!(trace.abs() <= n as f64 * (1.0 + 1e-6), "trace = {}", trace);
        }

        #[test]
        fn chebyshev_recurrence_holds(g in arb_graph(), k in 2usize..5) {
            let adj = g.adjacency(false, false);
            let t: Vec<Array2<f64>> = chebyshev_polynomials(&adj, k)
                .unwrap()
                .iter()
                .map(|m| m.to_dense())
                .collect();
            prop_assert_eq!(t.len(), k + 1);

            let scaled = scaled_laplacian(&adj).unwrap().to_dense();
            for i in 2..=k {
                let expected = 2.0 * scaled.dot(&t[i - 1]) - &t[i - 2];
                for (a, b) in t[i].iter().zip(expected.iter()) {
                    prop_assert!((a - b).abs() < 1e-9);
                }
            }
        }
    }
}

mod weight_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn pos_weight_balances_negatives(g in arb_graph()) {
            let p = preprocess(&g, 0, false).unwrap();
            let n = g.node_count() as f64;
            prop_assert!((p.pos_weight * p.edge_mass - (n * n - p.edge_mass)).abs() < 1e-9);
            prop_assert!(p.norm > 0.0);
        }

        #[test]
        fn edge_mass_counts_undirected_edges_twice(g in arb_graph()) {
            let p = preprocess(&g, 0, false).unwrap();
            prop_assert_eq!(p.edge_mass, 2.0 * g.edge_count() as f64);
        }

        #[test]
        fn class_weights_match_formula(n in 2usize..200, frac in 0.01f64..0.99) {
            let mass = ((n * n) as f64 * frac).max(1.0);
            let (pw, norm) = class_weights(n, mass);
            let total = (n * n) as f64;
            prop_assert!((pw - (total - mass) / mass).abs() < 1e-9);
            prop_assert!((norm - total / (2.0 * (total - mass))).abs() < 1e-9);
        }
    }
}
