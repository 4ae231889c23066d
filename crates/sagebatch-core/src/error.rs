//! Error types for the sagebatch core library.
//!
//! This module defines the error types shared by node encoding, indexing and
//! flat index composition.

use thiserror::Error;

use crate::node::{NamespaceId, NodeId};

/// The main error type for sagebatch-core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SageError {
    /// A namespace tag does not fit in the namespace bits of a node ID.
    #[error("Invalid namespace ID: {ns_id}")]
    InvalidNamespace {
        /// The namespace tag that was provided.
        ns_id: u64,
    },

    /// A raw node value does not fit in the value bits of a node ID.
    #[error("Invalid node value: {value}")]
    InvalidNodeValue {
        /// The value that was provided.
        value: u64,
    },

    /// A node was looked up in an indexing that does not contain it.
    #[error("Node {node} (ns_id {ns_id}) is missing from the {group} indexing")]
    IndexMiss {
        /// The node that was not found.
        node: NodeId,
        /// The namespace tag carried by the node.
        ns_id: NamespaceId,
        /// Name of the group whose indexing was consulted.
        group: &'static str,
    },

    /// A node carries a namespace tag that matches neither configured group.
    #[error("Invalid node: {node} with ns_id: {ns_id}, expect {user_ns_id} or {item_ns_id}")]
    UnknownGroup {
        /// The offending node.
        node: NodeId,
        /// The namespace tag carried by the node.
        ns_id: NamespaceId,
        /// The configured user namespace tag.
        user_ns_id: NamespaceId,
        /// The configured item namespace tag.
        item_ns_id: NamespaceId,
    },
}

/// A specialized Result type for sagebatch-core operations.
pub type Result<T> = std::result::Result<T, SageError>;
