//! Instance construction pipeline for bipartite GraphSAGE.
//!
//! This crate turns line-oriented edge or node records into training and
//! inference batches for a two-tower GraphSAGE model over a user/item
//! bipartite graph. Each batch carries, per encoder, a node feature block,
//! an optional neighbor feature block and per-hop self/neighbor adjacency
//! blocks, plus the edge indices and labels (training) or a lookup index and
//! the raw nodes (inference).
//!
//! # Overview
//!
//! The entry point is an [`InstanceReader`] created with [`build_reader`]. It
//! pulls records from a [`LineParser`], samples negatives through a
//! [`NegativeSampler`], samples subgraphs through a [`GraphClient`] and fills
//! an [`Instance`]:
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use sagebatch_core::make_node;
//! use sagebatch_data::prelude::*;
//!
//! let (u1, u2) = (make_node(0, 1).unwrap(), make_node(0, 2).unwrap());
//! let (i1, i2) = (make_node(1, 1).unwrap(), make_node(1, 2).unwrap());
//! let mut graph = InMemoryGraph::new();
//! graph.add_undirected_edge(u1, i1, 1.0);
//! graph.add_undirected_edge(u2, i2, 1.0);
//!
//! let config = ReaderConfig::from_kv_str("num_neg=1;num_neighbors=2").unwrap();
//! let input = format!("{u1} {i1}\n{u2} {i2}\n");
//! let mut reader = build_reader(
//!     ReaderKind::UnsupBipartite,
//!     config,
//!     Arc::new(graph),
//!     Arc::new(UniformNegativeSampler::new().with_seed(1)),
//!     LineParser::from_reader(Cursor::new(input)),
//! )
//! .unwrap();
//!
//! let mut inst = Instance::new();
//! while reader.get_batch(&mut inst).unwrap() {
//!     assert_eq!(inst.labels("Y").unwrap(), &[1.0, 0.0, 1.0, 0.0]);
//! }
//! assert!(inst.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`reader`] - Reader configuration, kinds and the bipartite reader
//! - [`flow`] - Multi-hop subgraph sampling and block filling
//! - [`graph`] - The graph client interface and an in-memory graph
//! - [`negative_sampling`] - Negative sampling strategies
//! - [`partition`] - User/item partitioning of raw nodes
//! - [`input`] - Line-oriented record parsing
//! - [`instance`] - The named-slot batch container
//! - [`slots`] - Slot names
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flow;
pub mod graph;
pub mod input;
pub mod instance;
pub mod negative_sampling;
pub mod partition;
pub mod reader;
pub mod slots;

pub use error::{DataError, Result};
pub use flow::{LevelNeighbors, LevelNodes, NeighborAggregationFlow};
pub use graph::{FeatureRow, GraphClient, InMemoryGraph, Neighbor};
pub use input::{EdgeRecord, FromLine, LineParser, NodeRecord};
pub use instance::{Instance, SlotValue};
pub use negative_sampling::{
    FrequencyNegativeSampler, NegativeSampler, NegativeSamplingConfig, SamplingStrategy,
    SelfExclusion, UniformNegativeSampler,
};
pub use partition::partition_nodes;
pub use reader::{
    build_reader, InstanceReader, ReaderConfig, ReaderKind, ReaderMode, ReaderStats,
    UnsupBipartiteReader,
};
pub use slots::{EncoderSlots, SlotNames};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::graph::{GraphClient, InMemoryGraph};
    pub use crate::input::LineParser;
    pub use crate::instance::Instance;
    pub use crate::negative_sampling::{
        NegativeSampler, NegativeSamplingConfig, SamplingStrategy, SelfExclusion,
        UniformNegativeSampler,
    };
    pub use crate::reader::{build_reader, InstanceReader, ReaderConfig, ReaderKind};
    pub use crate::slots::SlotNames;
}
