//! Instance readers.
//!
//! An [`InstanceReader`] pulls records from a [`LineParser`], queries the graph
//! and fills one [`Instance`] per call. Readers are created from a closed set
//! of [`ReaderKind`]s through [`build_reader`].
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use sagebatch_core::make_node;
//! use sagebatch_data::graph::InMemoryGraph;
//! use sagebatch_data::input::LineParser;
//! use sagebatch_data::instance::Instance;
//! use sagebatch_data::negative_sampling::UniformNegativeSampler;
//! use sagebatch_data::reader::{build_reader, ReaderConfig, ReaderKind};
//!
//! let user = make_node(0, 1).unwrap();
//! let item = make_node(1, 1).unwrap();
//! let mut graph = InMemoryGraph::new();
//! graph.add_undirected_edge(user, item, 1.0);
//!
//! let config = ReaderConfig::from_kv_str("is_train=0;num_neighbors=1").unwrap();
//! let parser = LineParser::from_reader(Cursor::new(format!("{user}\n{item}\n")));
//! let mut reader = build_reader(
//!     "unsup_bipartite_graphsage".parse::<ReaderKind>().unwrap(),
//!     config,
//!     Arc::new(graph),
//!     Arc::new(UniformNegativeSampler::new()),
//!     parser,
//! )
//! .unwrap();
//!
//! let mut inst = Instance::new();
//! assert!(reader.get_batch(&mut inst).unwrap());
//! assert_eq!(inst.batch_size(), 2);
//! assert!(!reader.get_batch(&mut inst).unwrap());
//! ```

mod bipartite;
mod config;

pub use bipartite::UnsupBipartiteReader;
pub use config::{ReaderConfig, ReaderMode};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::graph::GraphClient;
use crate::input::LineParser;
use crate::instance::Instance;
use crate::negative_sampling::NegativeSampler;

/// Running totals of a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStats {
    /// Batches produced.
    pub batches: usize,
    /// Records consumed into batches.
    pub records: usize,
    /// Rows written to the edge/label or index slots.
    pub rows: usize,
    /// Nodes dropped because their namespace matched neither group.
    pub invalid_nodes: usize,
    /// Negatives equal to their own positive destination.
    pub self_negatives: usize,
}

impl ReaderStats {
    /// Adds another reader's totals.
    pub fn merge(&mut self, other: &ReaderStats) {
        self.batches += other.batches;
        self.records += other.records;
        self.rows += other.rows;
        self.invalid_nodes += other.invalid_nodes;
        self.self_negatives += other.self_negatives;
    }
}

/// A producer of batches.
pub trait InstanceReader: Send {
    /// Fills `inst` with the next batch.
    ///
    /// Returns `Ok(true)` when a batch was produced and `Ok(false)` once the
    /// input is exhausted. On `Ok(false)` and on error, `inst` is left
    /// cleared.
    fn get_batch(&mut self, inst: &mut Instance) -> Result<bool>;

    /// Returns the reader configuration.
    fn config(&self) -> &ReaderConfig;

    /// Returns the running totals.
    fn stats(&self) -> ReaderStats;
}

/// The available reader kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderKind {
    /// Unsupervised bipartite GraphSAGE reader.
    #[serde(rename = "unsup_bipartite_graphsage", alias = "UnsupBipartiteInstReader")]
    UnsupBipartite,
}

impl ReaderKind {
    /// Every reader kind.
    pub const ALL: [ReaderKind; 1] = [ReaderKind::UnsupBipartite];

    /// Returns the canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            ReaderKind::UnsupBipartite => "unsup_bipartite_graphsage",
        }
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReaderKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unsup_bipartite_graphsage" | "UnsupBipartiteInstReader" => {
                Ok(ReaderKind::UnsupBipartite)
            }
            _ => Err(DataError::Config(format!("unknown reader kind: {s}"))),
        }
    }
}

/// Creates a reader of the given kind.
///
/// # Errors
///
/// Returns `DataError::Config` if `config` is invalid.
pub fn build_reader(
    kind: ReaderKind,
    config: ReaderConfig,
    graph: Arc<dyn GraphClient>,
    sampler: Arc<dyn NegativeSampler>,
    parser: LineParser,
) -> Result<Box<dyn InstanceReader>> {
    match kind {
        ReaderKind::UnsupBipartite => Ok(Box::new(UnsupBipartiteReader::new(
            config, graph, sampler, parser,
        )?)),
    }
}
