//! Dense, zero-based indexing of node sets.
//!
//! An [`Indexing`] maps every distinct node of an input sequence to an integer
//! in `[0, size)`, in first-seen order. Indexings are scoped to one batch and
//! one node group and are rebuilt for every batch.
//!
//! # Example
//!
//! ```
//! use sagebatch_core::indexing::Indexing;
//!
//! let indexing = Indexing::build([30, 10, 30, 20]);
//! assert_eq!(indexing.size(), 3);
//! assert_eq!(indexing.get(30), Some(0));
//! assert_eq!(indexing.get(10), Some(1));
//! assert_eq!(indexing.get(20), Some(2));
//! assert_eq!(indexing.get(99), None);
//! ```

use std::collections::HashMap;

use crate::node::NodeId;

/// A bijection between the distinct nodes of a set and `[0, size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indexing {
    index: HashMap<NodeId, usize>,
    nodes: Vec<NodeId>,
}

impl Indexing {
    /// Creates an empty indexing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an indexing over `nodes`, assigning indices in first-seen order.
    ///
    /// Duplicates keep the index of their first occurrence.
    pub fn build<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut indexing = Self::new();
        for node in nodes {
            indexing.insert(node);
        }
        indexing
    }

    /// Builds one indexing per level of a leveled node set.
    pub fn from_levels<L>(levels: &[L]) -> Vec<Indexing>
    where
        L: AsRef<[NodeId]>,
    {
        levels
            .iter()
            .map(|level| Self::build(level.as_ref().iter().copied()))
            .collect()
    }

    /// Adds a node if absent and returns its index.
    pub fn insert(&mut self, node: NodeId) -> usize {
        let next = self.nodes.len();
        let index = *self.index.entry(node).or_insert(next);
        if index == next {
            self.nodes.push(node);
        }
        index
    }

    /// Returns the index of `node`, or `None` if it was never inserted.
    #[inline]
    pub fn get(&self, node: NodeId) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// Returns `true` if `node` has an index.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Returns the number of distinct nodes.
    #[inline]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been indexed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the indexed nodes; position `i` holds the node with index `i`.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
    }
}
