//! Core types for building bipartite GraphSAGE batches.
//!
//! This crate provides the leaf abstractions shared by the sagebatch
//! pipeline:
//!
//! - **Node IDs**: 64-bit identifiers carrying a namespace tag that assigns
//!   each node to the user or the item partition.
//! - **Indexing**: dense, first-seen-order compaction of node sets.
//! - **Flat index composition**: one index space spanning users then items.
//! - **CSR blocks**: the sparse row structure used for features and
//!   adjacency.
//! - **Error types**: structured errors with node and tag context.
//!
//! # Example
//!
//! ```
//! use sagebatch_core::{make_node, FlatIndexer, GroupTags, Indexing};
//!
//! let u1 = make_node(0, 1).unwrap();
//! let i1 = make_node(1, 1).unwrap();
//!
//! let users = Indexing::build([u1]);
//! let items = Indexing::build([i1]);
//! let flat = FlatIndexer::new(GroupTags::default(), &users, &items);
//!
//! assert_eq!(flat.index(u1).unwrap(), 0);
//! assert_eq!(flat.index(i1).unwrap(), 1);
//! ```
//!
//! # Modules
//!
//! - [`node`]: Node ID encoding, node groups and group tags.
//! - [`indexing`]: Dense node indexing.
//! - [`flat_index`]: Cross-group index composition.
//! - [`csr`]: Compressed sparse row blocks.
//! - [`error`]: Error types for the library.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod csr;
pub mod error;
pub mod flat_index;
pub mod indexing;
pub mod node;

pub use csr::Csr;
pub use error::{Result, SageError};
pub use flat_index::FlatIndexer;
pub use indexing::Indexing;
pub use node::{
    make_node, node_namespace, node_value, GroupTags, NamespaceId, NodeGroup, NodeId,
};
