//! Plain-text graph formats.
//!
//! All formats are whitespace separated, one record per line. Blank lines and
//! lines starting with `#` are skipped.
//!
//! | Format | Line |
//! |--------|------|
//! | edge list | `src dst [weight]` |
//! | adjacency list | `node neighbor1 neighbor2 ...` |
//! | features | `node f1 f2 ... fF` |
//! | labels | `node label1 label2 ...` |
//!
//! Features and labels are attached to an existing graph; IDs that the
//! structure file did not introduce are rejected.

use crate::{AttributedGraph, Error, GraphView, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Iterate over `(line_number, tokens)` for every non-empty, non-comment line.
fn records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, Vec<String>)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Err(e) => Some(Err(Error::Io(e))),
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    let tokens = line.split_whitespace().map(str::to_string).collect();
                    Some(Ok((i + 1, tokens)))
                }
            }
        })
}

fn parse_f64(token: &str, line: usize) -> Result<f64> {
    token.parse::<f64>().map_err(|e| Error::Parse {
        line,
        message: format!("invalid number {token:?}: {e}"),
    })
}

/// Read an edge list. With `weighted`, the third column is required.
pub fn read_edgelist<R: BufRead>(reader: R, weighted: bool, directed: bool) -> Result<AttributedGraph> {
    let mut graph = AttributedGraph::new(directed);
    let mut self_loops = 0usize;

    for record in records(reader) {
        let (line, tokens) = record?;
        if tokens.len() < 2 {
            return Err(Error::Parse {
                line,
                message: "expected `src dst [weight]`".to_string(),
            });
        }

        let weight = if weighted {
            let token = tokens.get(2).ok_or_else(|| Error::Parse {
                line,
                message: "weighted edge list requires a weight column".to_string(),
            })?;
            parse_f64(token, line)?
        } else {
            1.0
        };

        if tokens[0] == tokens[1] {
            self_loops += 1;
        }
        graph.add_edge(&tokens[0], &tokens[1], weight);
    }

    if self_loops > 0 {
        warn!(self_loops, "self-loops are kept in the graph but excluded from adjacency matrices");
    }
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded edge list"
    );
    Ok(graph)
}

/// Read an adjacency list. A line with a single token adds an isolated node.
pub fn read_adjlist<R: BufRead>(reader: R, directed: bool) -> Result<AttributedGraph> {
    let mut graph = AttributedGraph::new(directed);

    for record in records(reader) {
        let (_, tokens) = record?;
        let Some((head, neighbors)) = tokens.split_first() else {
            continue;
        };
        graph.add_node(head);
        for neighbor in neighbors {
            graph.add_edge(head, neighbor, 1.0);
        }
    }

    Ok(graph)
}

/// Attach node features. Every row must have the same length.
pub fn read_features<R: BufRead>(graph: &mut AttributedGraph, reader: R) -> Result<()> {
    for record in records(reader) {
        let (line, tokens) = record?;
        let Some((id, values)) = tokens.split_first() else {
            continue;
        };
        let features = values
            .iter()
            .map(|t| parse_f64(t, line))
            .collect::<Result<Vec<_>>>()?;
        graph.set_features(id, features)?;
    }
    Ok(())
}

/// Attach node labels (multi-label lines allowed).
pub fn read_labels<R: BufRead>(graph: &mut AttributedGraph, reader: R) -> Result<()> {
    for record in records(reader) {
        let (_, tokens) = record?;
        let Some((id, labels)) = tokens.split_first() else {
            continue;
        };
        for label in labels {
            graph.add_label(id, label.as_str())?;
        }
    }
    Ok(())
}

impl AttributedGraph {
    /// Load from an edge list file.
    pub fn from_edgelist_file(path: impl AsRef<Path>, weighted: bool, directed: bool) -> Result<Self> {
        let file = File::open(path)?;
        read_edgelist(BufReader::new(file), weighted, directed)
    }

    /// Load from an adjacency list file.
    pub fn from_adjlist_file(path: impl AsRef<Path>, directed: bool) -> Result<Self> {
        let file = File::open(path)?;
        read_adjlist(BufReader::new(file), directed)
    }

    /// Attach features from a file.
    pub fn load_features_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        read_features(self, BufReader::new(file))
    }

    /// Attach labels from a file.
    pub fn load_labels_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        read_labels(self, BufReader::new(file))
    }
}
