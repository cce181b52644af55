//! Miner nodes and the pool a round ranks.

use crate::error::VerifyError;
use crate::verify::Ed25519Verifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Key identifying a node (hex-encoded public key or node id).
pub type NodeKey = String;

/// A miner participating in a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Node key.
    pub id: NodeKey,

    /// Position of the node in its pool. Rank lookups index the round
    /// permutation with this value.
    pub set_index: usize,

    /// Ed25519 public key (hex), if known.
    #[serde(default)]
    pub public_key: Option<String>,
}

impl Node {
    /// Creates a node with the given key and set index.
    pub fn new(id: impl Into<NodeKey>, set_index: usize) -> Self {
        Self {
            id: id.into(),
            set_index,
            public_key: None,
        }
    }

    /// Sets the node's public key.
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    /// Builds a verifier for messages signed by this node.
    pub fn verifier(&self) -> Result<Ed25519Verifier, VerifyError> {
        match &self.public_key {
            Some(key) => Ed25519Verifier::from_hex(key),
            None => Err(VerifyError::MissingKey(self.id.clone())),
        }
    }
}

/// An ordered set of miners.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    nodes: Vec<Arc<Node>>,

    /// Index for fast lookup by node key.
    index: HashMap<NodeKey, usize>,
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from nodes, assigning set indices in order.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut pool = Self::new();
        for node in nodes {
            pool.add(node);
        }
        pool
    }

    /// Adds a node at the next set index, replacing any node with the same
    /// key in place.
    pub fn add(&mut self, mut node: Node) -> Arc<Node> {
        if let Some(&i) = self.index.get(&node.id) {
            node.set_index = i;
            let node = Arc::new(node);
            self.nodes[i] = node.clone();
            return node;
        }

        node.set_index = self.nodes.len();
        let node = Arc::new(node);
        self.index.insert(node.id.clone(), node.set_index);
        self.nodes.push(node.clone());
        node
    }

    /// Returns the number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the pool has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the nodes in set-index order.
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    /// Returns a copy of the node list.
    pub fn copy_nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.clone()
    }

    /// Gets a node by key.
    pub fn get(&self, id: &str) -> Option<&Arc<Node>> {
        self.index.get(id).and_then(|&i| self.nodes.get(i))
    }

    /// Checks if a key belongs to the pool.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(count: usize) -> Pool {
        Pool::from_nodes((0..count).map(|i| Node::new(format!("miner-{}", i), 0)))
    }

    #[test]
    fn test_pool_assigns_set_index() {
        let pool = test_pool(4);

        assert_eq!(pool.size(), 4);
        for (i, node) in pool.nodes().iter().enumerate() {
            assert_eq!(node.set_index, i);
        }
    }

    #[test]
    fn test_pool_lookup() {
        let pool = test_pool(3);

        assert!(pool.contains("miner-2"));
        assert_eq!(pool.get("miner-2").unwrap().set_index, 2);
        assert!(pool.get("miner-9").is_none());
    }

    #[test]
    fn test_pool_replace_keeps_index() {
        let mut pool = test_pool(3);
        let replaced = pool.add(Node::new("miner-1", 99).with_public_key("aa"));

        assert_eq!(pool.size(), 3);
        assert_eq!(replaced.set_index, 1);
        assert_eq!(pool.get("miner-1").unwrap().public_key.as_deref(), Some("aa"));
    }

    #[test]
    fn test_node_without_key_has_no_verifier() {
        let node = Node::new("miner-0", 0);
        assert!(matches!(node.verifier(), Err(VerifyError::MissingKey(_))));
    }
}
