//! Node identifier encoding and node groups.
//!
//! A node ID is a 64-bit unsigned integer that carries a namespace tag in its
//! upper bits and the node value in its lower bits. The namespace tag decides
//! which typed partition of the bipartite graph a node belongs to.
//!
//! # Node ID Encoding
//!
//! - Upper 16 bits: namespace tag
//! - Lower 48 bits: node value

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};

/// A node identifier carrying a namespace tag in its upper bits.
pub type NodeId = u64;

/// A namespace tag identifying a typed node partition.
pub type NamespaceId = u16;

/// Number of bits used for the namespace tag.
pub const NS_BITS: u32 = 16;

/// Number of bits used for the node value.
pub const VALUE_BITS: u32 = 64 - NS_BITS;

/// Mask for extracting the node value from a node ID.
pub const VALUE_MASK: u64 = (1u64 << VALUE_BITS) - 1;

/// Maximum valid node value.
pub const MAX_NODE_VALUE: u64 = VALUE_MASK;

/// Extracts the namespace tag from a node ID.
///
/// # Examples
///
/// ```
/// use sagebatch_core::node::{make_node, node_namespace};
///
/// let node = make_node(3, 12345).unwrap();
/// assert_eq!(node_namespace(node), 3);
/// ```
#[inline]
pub fn node_namespace(node: NodeId) -> NamespaceId {
    (node >> VALUE_BITS) as NamespaceId
}

/// Extracts the node value (the namespace-free part) from a node ID.
///
/// # Examples
///
/// ```
/// use sagebatch_core::node::{make_node, node_value};
///
/// let node = make_node(3, 12345).unwrap();
/// assert_eq!(node_value(node), 12345);
/// ```
#[inline]
pub fn node_value(node: NodeId) -> u64 {
    node & VALUE_MASK
}

/// Creates a node ID from a namespace tag and a node value.
///
/// # Arguments
///
/// * `ns_id` - The namespace tag (must fit in [`NS_BITS`]).
/// * `value` - The node value (must fit in [`VALUE_BITS`]).
///
/// # Errors
///
/// Returns `SageError::InvalidNamespace` if the tag is too large and
/// `SageError::InvalidNodeValue` if the value is too large.
///
/// # Examples
///
/// ```
/// use sagebatch_core::node::make_node;
///
/// let node = make_node(1, 999).unwrap();
/// assert_eq!(node, (1u64 << 48) | 999);
/// ```
#[inline]
pub fn make_node(ns_id: u64, value: u64) -> Result<NodeId> {
    if ns_id > NamespaceId::MAX as u64 {
        return Err(SageError::InvalidNamespace { ns_id });
    }
    if value > MAX_NODE_VALUE {
        return Err(SageError::InvalidNodeValue { value });
    }
    Ok((ns_id << VALUE_BITS) | value)
}

/// One of the two typed partitions of the bipartite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroup {
    /// The user partition.
    User,
    /// The item partition.
    Item,
}

impl NodeGroup {
    /// Both groups, users first.
    pub const ALL: [NodeGroup; 2] = [NodeGroup::User, NodeGroup::Item];

    /// Returns the lowercase group name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeGroup::User => "user",
            NodeGroup::Item => "item",
        }
    }
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The namespace tags assigned to the user and item groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTags {
    /// Namespace tag of user nodes.
    pub user: NamespaceId,
    /// Namespace tag of item nodes.
    pub item: NamespaceId,
}

impl Default for GroupTags {
    fn default() -> Self {
        Self { user: 0, item: 1 }
    }
}

impl GroupTags {
    /// Creates a new tag pair.
    pub fn new(user: NamespaceId, item: NamespaceId) -> Self {
        Self { user, item }
    }

    /// Resolves the group of a node from its namespace tag.
    ///
    /// Returns `None` when the tag matches neither group.
    #[inline]
    pub fn group_of(&self, node: NodeId) -> Option<NodeGroup> {
        let ns_id = node_namespace(node);
        if ns_id == self.user {
            Some(NodeGroup::User)
        } else if ns_id == self.item {
            Some(NodeGroup::Item)
        } else {
            None
        }
    }

    /// Like [`GroupTags::group_of`], but reports an unknown tag as an error.
    pub fn require_group(&self, node: NodeId) -> Result<NodeGroup> {
        self.group_of(node).ok_or(SageError::UnknownGroup {
            node,
            ns_id: node_namespace(node),
            user_ns_id: self.user,
            item_ns_id: self.item,
        })
    }

    /// Returns the namespace tag of a group.
    pub fn tag(&self, group: NodeGroup) -> NamespaceId {
        match group {
            NodeGroup::User => self.user,
            NodeGroup::Item => self.item,
        }
    }
}
