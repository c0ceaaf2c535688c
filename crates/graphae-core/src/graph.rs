use crate::{Error, Node, NodeId, Result};
use ndarray::Array2;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use std::collections::{BTreeMap, HashMap};

/// Read-only view of a graph as consumed by embedding models.
///
/// Node indices are dense in `[0, node_count())` and coincide across
/// [`features`](GraphView::features), [`adjacency`](GraphView::adjacency) and
/// [`node_labels`](GraphView::node_labels). `look_up` and `look_back` form a
/// bijection between external IDs and those indices.
pub trait GraphView {
    /// Number of nodes (N).
    fn node_count(&self) -> usize;

    /// Number of stored edges (an undirected edge counts once).
    fn edge_count(&self) -> usize;

    /// Whether every node carries a feature vector.
    fn is_attributed(&self) -> bool;

    /// Dense N x F feature matrix, row `i` = node `i`.
    fn features(&self) -> Result<Array2<f64>>;

    /// Sparse N x N adjacency matrix in CSR form.
    ///
    /// - `weighted = false` stores 1.0 for every edge.
    /// - `directed = false` symmetrizes: every edge `u -> v` also yields `v -> u`.
    ///
    /// Self-loops are never included.
    fn adjacency(&self, weighted: bool, directed: bool) -> CsMat<f64>;

    /// Labels of the node at `index` (empty for unlabeled nodes).
    fn node_labels(&self, index: usize) -> &[String];

    /// Dense index of an external node ID.
    fn look_up(&self, id: &str) -> Option<usize>;

    /// External node ID at a dense index.
    fn look_back(&self, index: usize) -> Option<&str>;
}

/// An in-memory attributed graph.
///
/// Uses petgraph's directed graph internally; undirected graphs store each
/// edge once and are symmetrized on export. Nodes are never removed, so
/// petgraph node indices are dense and serve directly as matrix rows.
///
/// # Example
///
/// ```rust
/// use graphae_core::{AttributedGraph, GraphView};
///
/// let mut g = AttributedGraph::new(false);
/// g.add_edge("a", "b", 1.0);
/// g.add_edge("b", "c", 1.0);
/// g.set_features("a", vec![1.0, 0.0]).unwrap();
/// g.set_features("b", vec![0.0, 1.0]).unwrap();
/// g.set_features("c", vec![1.0, 1.0]).unwrap();
///
/// assert_eq!(g.node_count(), 3);
/// assert!(g.is_attributed());
/// assert_eq!(g.features().unwrap().dim(), (3, 2));
/// ```
#[derive(Debug, Clone)]
pub struct AttributedGraph {
    /// The underlying graph; edge weights are `f64`.
    graph: DiGraph<Node, f64>,

    /// Map from node ID to node index.
    node_index: HashMap<NodeId, NodeIndex>,

    directed: bool,

    /// Length of the first feature vector attached; all others must match.
    feature_dim: Option<usize>,
}

impl Default for AttributedGraph {
    fn default() -> Self {
        Self::new(false)
    }
}

impl AttributedGraph {
    /// Create an empty graph.
    pub fn new(directed: bool) -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            directed,
            feature_dim: None,
        }
    }

    /// Create a graph with estimated capacity.
    pub fn with_capacity(directed: bool, nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            node_index: HashMap::with_capacity(nodes),
            directed,
            feature_dim: None,
        }
    }

    /// Add a node if it is not present yet. Returns its dense index.
    pub fn add_node(&mut self, id: &str) -> usize {
        self.get_or_create_node(id).index()
    }

    fn get_or_create_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }

        let idx = self.graph.add_node(Node::new(id));
        self.node_index.insert(NodeId::from(id), idx);
        idx
    }

    /// Add an edge, creating missing endpoints.
    ///
    /// Re-adding an existing edge replaces its weight. In an undirected graph
    /// `(u, v)` and `(v, u)` are the same edge.
    pub fn add_edge(&mut self, src: &str, dst: &str, weight: f64) {
        let s = self.get_or_create_node(src);
        let t = self.get_or_create_node(dst);

        let existing = self.graph.find_edge(s, t).or_else(|| {
            if self.directed {
                None
            } else {
                self.graph.find_edge(t, s)
            }
        });

        match existing {
            Some(edge) => self.graph[edge] = weight,
            None => {
                self.graph.add_edge(s, t, weight);
            }
        }
    }

    /// Attach a feature vector to an existing node.
    pub fn set_features(&mut self, id: &str, features: Vec<f64>) -> Result<()> {
        let idx = *self
            .node_index
            .get(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;

        match self.feature_dim {
            Some(expected) if expected != features.len() => {
                return Err(Error::FeatureDimension {
                    expected,
                    got: features.len(),
                });
            }
            Some(_) => {}
            None => self.feature_dim = Some(features.len()),
        }

        self.graph[idx].features = Some(features);
        Ok(())
    }

    /// Add a label to an existing node.
    pub fn add_label(&mut self, id: &str, label: impl Into<String>) -> Result<()> {
        let idx = *self
            .node_index
            .get(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;

        let label = label.into();
        let labels = &mut self.graph[idx].labels;
        if !labels.contains(&label) {
            labels.push(label);
        }
        Ok(())
    }

    /// Get a node by ID.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Iterate over all nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Whether edges are directed.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether any edge carries a weight other than 1.
    pub fn is_weighted(&self) -> bool {
        self.graph.edge_weights().any(|&w| (w - 1.0).abs() > f64::EPSILON)
    }

    /// Feature dimension, if any features are attached.
    pub fn feature_dim(&self) -> Option<usize> {
        self.feature_dim
    }

    /// Check if an edge exists between two nodes, honoring directedness.
    pub fn has_edge(&self, src: &str, dst: &str) -> bool {
        let (Some(&s), Some(&t)) = (self.node_index.get(src), self.node_index.get(dst)) else {
            return false;
        };

        self.graph.find_edge(s, t).is_some()
            || (!self.directed && self.graph.find_edge(t, s).is_some())
    }

    /// Get the underlying petgraph for advanced operations.
    pub fn as_petgraph(&self) -> &DiGraph<Node, f64> {
        &self.graph
    }
}

impl GraphView for AttributedGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn is_attributed(&self) -> bool {
        self.graph.node_count() > 0 && self.graph.node_weights().all(|n| n.features.is_some())
    }

    fn features(&self) -> Result<Array2<f64>> {
        let total = self.graph.node_count();
        let missing = self
            .graph
            .node_weights()
            .filter(|n| n.features.is_none())
            .count();
        if missing > 0 || total == 0 {
            return Err(Error::MissingFeatures { missing, total });
        }

        let dim = self.feature_dim.unwrap_or(0);
        let mut out = Array2::zeros((total, dim));
        for (i, node) in self.graph.node_weights().enumerate() {
            if let Some(features) = &node.features {
                for (j, &v) in features.iter().enumerate() {
                    out[[i, j]] = v;
                }
            }
        }
        Ok(out)
    }

    fn adjacency(&self, weighted: bool, directed: bool) -> CsMat<f64> {
        let n = self.graph.node_count();

        // Ordered map collapses reciprocal pairs when symmetrizing.
        let mut entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for edge in self.graph.edge_references() {
            let (s, t) = (edge.source().index(), edge.target().index());
            if s == t {
                continue;
            }
            let w = if weighted { *edge.weight() } else { 1.0 };
            entries.insert((s, t), w);
            if !directed {
                entries.insert((t, s), w);
            }
        }

        let mut tri = TriMat::with_capacity((n, n), entries.len());
        for ((i, j), w) in entries {
            tri.add_triplet(i, j, w);
        }
        tri.to_csr()
    }

    fn node_labels(&self, index: usize) -> &[String] {
        self.graph
            .node_weight(NodeIndex::new(index))
            .map(|n| n.labels.as_slice())
            .unwrap_or(&[])
    }

    fn look_up(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).map(|idx| idx.index())
    }

    fn look_back(&self, index: usize) -> Option<&str> {
        self.graph
            .node_weight(NodeIndex::new(index))
            .map(|n| n.id.as_str())
    }
}

/// Statistics about an attributed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of stored edges.
    pub edge_count: usize,
    /// Whether the graph is directed.
    pub directed: bool,
    /// Whether any edge weight differs from 1.
    pub weighted: bool,
    /// Whether every node has features.
    pub attributed: bool,
    /// Feature dimension (0 when no features are attached).
    pub feature_dim: usize,
    /// Number of distinct labels.
    pub label_count: usize,
    /// Nodes without any incident edge (self-loops ignored).
    pub isolated_nodes: usize,
    /// Average degree of the undirected projection.
    pub avg_degree: f64,
}

impl AttributedGraph {
    /// Compute statistics about the graph.
    pub fn stats(&self) -> GraphStats {
        let node_count = self.node_count();
        let adj = self.adjacency(false, false);

        let mut labels: Vec<&str> = self
            .graph
            .node_weights()
            .flat_map(|n| n.labels.iter().map(String::as_str))
            .collect();
        labels.sort_unstable();
        labels.dedup();

        let isolated_nodes = adj
            .outer_iterator()
            .filter(|row| row.nnz() == 0)
            .count();

        let avg_degree = if node_count > 0 {
            adj.nnz() as f64 / node_count as f64
        } else {
            0.0
        };

        GraphStats {
            node_count,
            edge_count: self.edge_count(),
            directed: self.directed,
            weighted: self.is_weighted(),
            attributed: self.is_attributed(),
            feature_dim: self.feature_dim.unwrap_or(0),
            label_count: labels.len(),
            isolated_nodes,
            avg_degree,
        }
    }
}
