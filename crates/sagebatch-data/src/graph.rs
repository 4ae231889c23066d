//! Graph storage and query interface.
//!
//! The pipeline never owns the graph: it talks to a [`GraphClient`], which is
//! assumed to be a shared, read-mostly service that can be called from many
//! readers at once. [`InMemoryGraph`] is a self-contained implementation for
//! tests, tools and small graphs.
//!
//! # Example
//!
//! ```
//! use sagebatch_data::graph::{GraphClient, InMemoryGraph};
//!
//! let mut graph = InMemoryGraph::new().with_seed(1);
//! graph.add_undirected_edge(1, 100, 1.0);
//! graph.add_undirected_edge(1, 101, 2.0);
//!
//! let sampled = graph.sample_neighbors(&[1, 100, 5], 8).unwrap();
//! assert_eq!(sampled[0].len(), 2);
//! assert_eq!(sampled[1].len(), 1);
//! assert!(sampled[2].is_empty());
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sagebatch_core::NodeId;

use crate::error::{DataError, Result};

/// A weighted neighbor of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// The neighbor node.
    pub node: NodeId,
    /// The edge weight.
    pub weight: f32,
}

impl Neighbor {
    /// Creates a neighbor entry.
    pub fn new(node: NodeId, weight: f32) -> Self {
        Self { node, weight }
    }
}

/// Sparse `(feature_id, value)` pairs of one node.
pub type FeatureRow = Vec<(u64, f32)>;

/// Query interface of the graph storage service.
pub trait GraphClient: Send + Sync {
    /// Samples up to `count` neighbors of every node, in input order.
    ///
    /// Nodes absent from the graph get an empty list.
    fn sample_neighbors(&self, nodes: &[NodeId], count: usize) -> Result<Vec<Vec<Neighbor>>>;

    /// Returns the stored features of every node, in input order.
    ///
    /// Nodes without features get an empty row.
    fn node_features(&self, nodes: &[NodeId]) -> Result<Vec<FeatureRow>>;

    /// Returns the full stored neighborhood of every node as a feature row.
    fn neighbor_features(&self, nodes: &[NodeId]) -> Result<Vec<FeatureRow>>;
}

/// A graph held entirely in memory.
#[derive(Debug)]
pub struct InMemoryGraph {
    adjacency: HashMap<NodeId, Vec<Neighbor>>,
    features: HashMap<NodeId, FeatureRow>,
    num_edges: usize,
    rng: Mutex<StdRng>,
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            adjacency: HashMap::new(),
            features: HashMap::new(),
            num_edges: 0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Sets the seed of the neighbor sampler.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Adds a directed edge `src -> dst`.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, weight: f32) {
        self.adjacency
            .entry(src)
            .or_default()
            .push(Neighbor::new(dst, weight));
        self.num_edges += 1;
    }

    /// Adds the edge in both directions.
    pub fn add_undirected_edge(&mut self, a: NodeId, b: NodeId, weight: f32) {
        self.add_edge(a, b, weight);
        self.add_edge(b, a, weight);
    }

    /// Replaces the features of a node.
    pub fn set_node_features(&mut self, node: NodeId, features: FeatureRow) {
        self.features.insert(node, features);
    }

    /// Returns the number of nodes with at least one outgoing edge.
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns the number of directed edges.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Returns the stored neighbors of a node.
    pub fn neighbors(&self, node: NodeId) -> &[Neighbor] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Loads an edge list with one `src dst [weight]` edge per line.
    ///
    /// Blank lines and `#` comments are ignored. When `undirected` is set,
    /// every edge is also inserted in reverse.
    pub fn from_reader<R: BufRead>(reader: R, undirected: bool) -> Result<Self> {
        let mut graph = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (src, dst, weight) = parse_edge_line(line).map_err(|message| DataError::Parse {
                line: i + 1,
                message,
            })?;
            if undirected {
                graph.add_undirected_edge(src, dst, weight);
            } else {
                graph.add_edge(src, dst, weight);
            }
        }
        Ok(graph)
    }

    /// Loads an edge list file, see [`InMemoryGraph::from_reader`].
    pub fn load(path: impl AsRef<Path>, undirected: bool) -> Result<Self> {
        let path = path.as_ref();
        let graph = Self::from_reader(BufReader::new(File::open(path)?), undirected)?;
        info!(
            "Load graph {}: {} node(s), {} edge(s)",
            path.display(),
            graph.num_nodes(),
            graph.num_edges()
        );
        Ok(graph)
    }
}

fn parse_node_id(s: &str) -> std::result::Result<NodeId, String> {
    s.parse::<NodeId>()
        .map_err(|e| format!("invalid node id {s:?}: {e}"))
}

fn parse_edge_line(line: &str) -> std::result::Result<(NodeId, NodeId, f32), String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [src, dst] => Ok((parse_node_id(src)?, parse_node_id(dst)?, 1.0)),
        [src, dst, weight] => {
            let weight = weight
                .parse::<f32>()
                .map_err(|e| format!("invalid weight {weight:?}: {e}"))?;
            Ok((parse_node_id(src)?, parse_node_id(dst)?, weight))
        }
        _ => Err(format!("expected `src dst [weight]`, got {} field(s)", fields.len())),
    }
}

impl GraphClient for InMemoryGraph {
    fn sample_neighbors(&self, nodes: &[NodeId], count: usize) -> Result<Vec<Vec<Neighbor>>> {
        let mut rng = self.rng.lock();
        Ok(nodes
            .iter()
            .map(|node| {
                let all = self.neighbors(*node);
                if all.len() <= count {
                    all.to_vec()
                } else {
                    rand::seq::index::sample(&mut *rng, all.len(), count)
                        .into_iter()
                        .map(|i| all[i])
                        .collect()
                }
            })
            .collect())
    }

    fn node_features(&self, nodes: &[NodeId]) -> Result<Vec<FeatureRow>> {
        Ok(nodes
            .iter()
            .map(|node| self.features.get(node).cloned().unwrap_or_default())
            .collect())
    }

    fn neighbor_features(&self, nodes: &[NodeId]) -> Result<Vec<FeatureRow>> {
        Ok(nodes
            .iter()
            .map(|&node| {
                let neighbors = self.neighbors(node);
                if neighbors.is_empty() {
                    debug!("Node {} has no stored neighbor", node);
                }
                neighbors.iter().map(|n| (n.node, n.weight)).collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn star(center: NodeId, leaves: std::ops::Range<NodeId>) -> InMemoryGraph {
        let mut graph = InMemoryGraph::new().with_seed(3);
        for leaf in leaves {
            graph.add_undirected_edge(center, leaf, 1.0);
        }
        graph
    }

    #[test]
    fn test_sample_caps_at_count() {
        let graph = star(1, 100..120);
        let sampled = graph.sample_neighbors(&[1], 5).unwrap();
        assert_eq!(sampled[0].len(), 5);

        let mut distinct: Vec<_> = sampled[0].iter().map(|n| n.node).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 5);
        assert!(distinct.iter().all(|n| (100..120).contains(n)));
    }

    #[test]
    fn test_sample_returns_all_when_small() {
        let graph = star(1, 100..103);
        let sampled = graph.sample_neighbors(&[1, 100], 10).unwrap();
        assert_eq!(sampled[0].len(), 3);
        assert_eq!(sampled[1], vec![Neighbor::new(1, 1.0)]);
    }

    #[test]
    fn test_sample_zero_and_unknown() {
        let graph = star(1, 100..103);
        let sampled = graph.sample_neighbors(&[1, 999], 0).unwrap();
        assert!(sampled.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_features() {
        let mut graph = star(1, 100..102);
        graph.set_node_features(1, vec![(7, 0.5)]);

        let features = graph.node_features(&[1, 100]).unwrap();
        assert_eq!(features, vec![vec![(7, 0.5)], vec![]]);

        let neigh = graph.neighbor_features(&[1]).unwrap();
        assert_eq!(neigh, vec![vec![(100, 1.0), (101, 1.0)]]);
    }

    #[test]
    fn test_from_reader() {
        let text = "# edges\n1 2\n1 3 0.5\n\n";
        let graph = InMemoryGraph::from_reader(Cursor::new(text), false).unwrap();
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.neighbors(1), &[Neighbor::new(2, 1.0), Neighbor::new(3, 0.5)]);
        assert!(graph.neighbors(2).is_empty());

        let graph = InMemoryGraph::from_reader(Cursor::new(text), true).unwrap();
        assert_eq!(graph.num_edges(), 4);
        assert_eq!(graph.neighbors(3), &[Neighbor::new(1, 0.5)]);
    }

    #[test]
    fn test_from_reader_rejects_bad_line() {
        let err = InMemoryGraph::from_reader(Cursor::new("1 2\n1 x\n"), false).unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "5 6 2.0").unwrap();
        file.flush().unwrap();

        let graph = InMemoryGraph::load(file.path(), true).unwrap();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.neighbors(6), &[Neighbor::new(5, 2.0)]);
    }
}
