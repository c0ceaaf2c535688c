//! Node types for attributed graphs.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// External identifier of a node, as it appears in input files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A node with its optional attribute vector and label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// External identifier.
    pub id: NodeId,

    /// Feature vector; `None` until features are attached.
    pub features: Option<Vec<f64>>,

    /// Class labels (multi-label), in the order they were added.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Node {
    /// Create a node with no features and no labels.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            features: None,
            labels: Vec::new(),
        }
    }

    /// Attach a feature vector.
    pub fn with_features(mut self, features: Vec<f64>) -> Self {
        self.features = Some(features);
        self
    }

    /// Add a label. Duplicate labels are kept once.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn node_id_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(NodeId::from("a"), 1usize);
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn with_label_dedups() {
        let node = Node::new("n").with_label("x").with_label("x").with_label("y");
        assert_eq!(node.labels, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn with_features_replaces_previous_vector() {
        let node = Node::new("n").with_features(vec![1.0]).with_features(vec![0.5, 0.5]);
        assert_eq!(node.features, Some(vec![0.5, 0.5]));
        assert!(node.labels.is_empty());
    }
}
