// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]

//! Attributed graphs for node-embedding models.
//!
//! This crate holds the graph side of the toolkit:
//!
//! - [`AttributedGraph`] - in-memory graph with per-node features and labels
//! - [`GraphView`] - the read-only accessor surface models consume
//! - [`formats`] - edge list, adjacency list, feature and label file loaders
//!
//! # Indices
//!
//! Models work on dense matrices, so every node gets a dense index in
//! insertion order. `look_up` maps an external ID to its row, `look_back`
//! maps a row back to the ID:
//!
//! ```text
//! file ids:   "u17"  "u3"  "u42"
//! rows:         0      1      2
//! ```
//!
//! The same row numbering is used by the feature matrix, the adjacency
//! matrix and the label matrix, which is what lets embedding rows be mapped
//! back to nodes after training.
//!
//! # Example
//!
//! ```rust
//! use graphae_core::{formats, GraphView};
//! use std::io::Cursor;
//!
//! let mut g = formats::read_edgelist(Cursor::new("a b\nb c\n"), false, false).unwrap();
//! formats::read_features(&mut g, Cursor::new("a 1 0\nb 0 1\nc 1 1\n")).unwrap();
//!
//! let adj = g.adjacency(false, false);
//! assert_eq!(adj.nnz(), 4);
//! assert_eq!(g.look_back(2), Some("c"));
//! ```

mod error;
pub mod formats;
mod graph;
mod node;

pub use error::{Error, Result};
pub use graph::{AttributedGraph, GraphStats, GraphView};
pub use node::{Node, NodeId};

// Re-export matrix crates so downstream code agrees on versions
pub use ndarray;
pub use petgraph;
pub use sprs;
