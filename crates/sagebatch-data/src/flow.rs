//! Multi-hop subgraph sampling and batch block filling.
//!
//! [`NeighborAggregationFlow`] wraps a [`GraphClient`] and turns seed nodes
//! into the leveled structures a GraphSAGE encoder consumes:
//!
//! - a [`LevelNodes`] set, one deduplicated node list per hop level;
//! - a [`LevelNeighbors`] map, the sampled neighbors of every node per hop;
//! - feature blocks, adjacency blocks and edge/label arrays written into an
//!   [`Instance`].
//!
//! Levels are nested: level `h + 1` starts with the nodes of level `h`,
//! followed by newly sampled neighbors in first-seen order. The deepest level
//! therefore covers every sampled node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use sagebatch_core::{Csr, Indexing, NodeId};

use crate::error::{DataError, Result};
use crate::graph::{GraphClient, Neighbor};
use crate::instance::Instance;

/// One deduplicated node list per hop level; level 0 holds the seeds.
pub type LevelNodes = Vec<Vec<NodeId>>;

/// Sampled neighbors of every node, one map per hop.
pub type LevelNeighbors = Vec<HashMap<NodeId, Vec<Neighbor>>>;

/// Subgraph sampling and block filling on top of a graph client.
#[derive(Clone)]
pub struct NeighborAggregationFlow {
    client: Arc<dyn GraphClient>,
}

impl std::fmt::Debug for NeighborAggregationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborAggregationFlow").finish_non_exhaustive()
    }
}

impl NeighborAggregationFlow {
    /// Creates a flow backed by `client`.
    pub fn new(client: Arc<dyn GraphClient>) -> Self {
        Self { client }
    }

    /// Samples a multi-hop subgraph around `seeds`.
    ///
    /// # Arguments
    ///
    /// * `seeds` - Seed nodes, possibly with duplicates
    /// * `fanout` - Maximum neighbors sampled per node at each hop
    ///
    /// # Returns
    ///
    /// `fanout.len() + 1` node levels and `fanout.len()` neighbor maps. An
    /// empty seed list yields empty levels.
    pub fn sample_subgraph(
        &self,
        seeds: &[NodeId],
        fanout: &[usize],
    ) -> Result<(LevelNodes, LevelNeighbors)> {
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(seeds.len());
        let level0: Vec<NodeId> = seeds.iter().copied().filter(|n| seen.insert(*n)).collect();

        let mut level_nodes: LevelNodes = Vec::with_capacity(fanout.len() + 1);
        let mut level_neighs: LevelNeighbors = Vec::with_capacity(fanout.len());
        level_nodes.push(level0);

        for &count in fanout {
            let current = &level_nodes[level_nodes.len() - 1];
            let sampled = self.client.sample_neighbors(current, count)?;
            if sampled.len() != current.len() {
                return Err(DataError::Graph(format!(
                    "sampled {} neighbor list(s) for {} node(s)",
                    sampled.len(),
                    current.len()
                )));
            }

            let mut next = current.clone();
            let mut neighs = HashMap::with_capacity(current.len());
            for (&node, neighbors) in current.iter().zip(sampled) {
                next.extend(
                    neighbors
                        .iter()
                        .map(|n| n.node)
                        .filter(|n| seen.insert(*n)),
                );
                neighs.insert(node, neighbors);
            }
            level_nodes.push(next);
            level_neighs.push(neighs);
        }

        debug!(
            "Sampled subgraph: {} seed(s), level sizes {:?}",
            seeds.len(),
            level_nodes.iter().map(Vec::len).collect::<Vec<_>>()
        );
        Ok((level_nodes, level_neighs))
    }

    /// Writes one feature row per node of the deepest level into `slot`.
    ///
    /// Row `r` belongs to the node with index `r` in the deepest level. A
    /// node without stored features gets the identity entry `(node, 1.0)`.
    pub fn fill_level_node_feature(
        &self,
        inst: &mut Instance,
        slot: &str,
        level_nodes: &[Vec<NodeId>],
    ) -> Result<()> {
        let nodes = deepest_level(level_nodes);
        let features = self.client.node_features(nodes)?;
        let csr = inst.get_or_insert_csr(slot);
        csr.clear();
        for (&node, row) in nodes.iter().zip(features.iter()) {
            if row.is_empty() {
                csr.emplace(node, 1.0);
            } else {
                for &(feature, value) in row {
                    csr.emplace(feature, value);
                }
            }
            csr.add_row();
        }
        check_row_count(csr, nodes.len(), slot)
    }

    /// Writes one neighbor feature row per node of the deepest level into
    /// `slot`.
    pub fn fill_level_neigh_feature(
        &self,
        inst: &mut Instance,
        slot: &str,
        level_nodes: &[Vec<NodeId>],
    ) -> Result<()> {
        let nodes = deepest_level(level_nodes);
        let features = self.client.neighbor_features(nodes)?;
        let csr = inst.get_or_insert_csr(slot);
        csr.clear();
        for row in features.iter().take(nodes.len()) {
            for &(feature, value) in row {
                csr.emplace(feature, value);
            }
            csr.add_row();
        }
        check_row_count(csr, nodes.len(), slot)
    }

    /// Writes per-hop self and neighbor blocks.
    ///
    /// For hop `h`, row `r` of both blocks describes node `r` of level `h`.
    /// The self block holds that node's index in level `h + 1` with weight 1.
    /// The neighbor block holds the level `h + 1` index of each sampled
    /// neighbor. Weights are `1 / degree` when `directed` is false, and edge
    /// weights normalized to sum 1 when it is true. A node without sampled
    /// neighbors gets an empty neighbor row.
    ///
    /// # Errors
    ///
    /// Returns a graph error if the levels, neighbor maps and indexings do
    /// not line up, or if a node or neighbor is absent from the next level's
    /// indexing.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_self_and_neigh_graph_block(
        &self,
        inst: &mut Instance,
        self_slot: &str,
        neigh_slot: &str,
        level_nodes: &[Vec<NodeId>],
        level_neighs: &[HashMap<NodeId, Vec<Neighbor>>],
        indexings: &[Indexing],
        directed: bool,
    ) -> Result<()> {
        if indexings.len() != level_nodes.len() || level_neighs.len() + 1 != level_nodes.len() {
            return Err(DataError::Graph(format!(
                "inconsistent subgraph: {} level(s), {} neighbor map(s), {} indexing(s)",
                level_nodes.len(),
                level_neighs.len(),
                indexings.len()
            )));
        }

        let mut self_blocks = Vec::with_capacity(level_neighs.len());
        let mut neigh_blocks = Vec::with_capacity(level_neighs.len());
        for (hop, neighs) in level_neighs.iter().enumerate() {
            let next = &indexings[hop + 1];
            let mut self_block = Csr::new();
            let mut neigh_block = Csr::new();

            for &node in &level_nodes[hop] {
                self_block.emplace(lookup(next, node, hop + 1)? as u64, 1.0);
                self_block.add_row();

                let neighbors = neighs.get(&node).map(Vec::as_slice).unwrap_or(&[]);
                let weights = normalized_weights(neighbors, directed);
                for (neighbor, weight) in neighbors.iter().zip(weights) {
                    neigh_block.emplace(lookup(next, neighbor.node, hop + 1)? as u64, weight);
                }
                neigh_block.add_row();
            }
            self_blocks.push(self_block);
            neigh_blocks.push(neigh_block);
        }

        *inst.get_or_insert_csr_list(self_slot) = self_blocks;
        *inst.get_or_insert_csr_list(neigh_slot) = neigh_blocks;
        Ok(())
    }

    /// Writes source indices, destination indices and labels for a batch of
    /// positive edges and their negatives.
    ///
    /// For record `i` the positive pair `(src_i, dst_i)` with label 1 is
    /// written first, followed by `(src_i, neg)` with label 0 for every
    /// negative of `dst_i`.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by an index function, or a graph
    /// error if the input arrays are not parallel.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_edge_and_label<S, D>(
        &self,
        inst: &mut Instance,
        src_slot: &str,
        dst_slot: &str,
        label_slot: &str,
        src_nodes: &[NodeId],
        dst_nodes: &[NodeId],
        neg_nodes_list: &[Vec<NodeId>],
        src_index: S,
        dst_index: D,
    ) -> Result<()>
    where
        S: Fn(NodeId) -> Result<usize>,
        D: Fn(NodeId) -> Result<usize>,
    {
        if src_nodes.len() != dst_nodes.len() || dst_nodes.len() != neg_nodes_list.len() {
            return Err(DataError::Graph(format!(
                "edge arrays differ in length: {} src, {} dst, {} negative list(s)",
                src_nodes.len(),
                dst_nodes.len(),
                neg_nodes_list.len()
            )));
        }

        let rows = src_nodes.len() + neg_nodes_list.iter().map(Vec::len).sum::<usize>();
        let mut src_ids = Vec::with_capacity(rows);
        let mut dst_ids = Vec::with_capacity(rows);
        let mut labels = Vec::with_capacity(rows);

        for ((&src, &dst), negs) in src_nodes.iter().zip(dst_nodes).zip(neg_nodes_list) {
            let src_idx = src_index(src)?;
            src_ids.push(src_idx);
            dst_ids.push(dst_index(dst)?);
            labels.push(1.0);

            for &neg in negs {
                src_ids.push(src_idx);
                dst_ids.push(dst_index(neg)?);
                labels.push(0.0);
            }
        }

        *inst.get_or_insert_indices(src_slot) = src_ids;
        *inst.get_or_insert_indices(dst_slot) = dst_ids;
        *inst.get_or_insert_labels(label_slot) = labels;
        Ok(())
    }
}

fn deepest_level(level_nodes: &[Vec<NodeId>]) -> &[NodeId] {
    level_nodes.last().map(Vec::as_slice).unwrap_or(&[])
}

fn lookup(indexing: &Indexing, node: NodeId, level: usize) -> Result<usize> {
    indexing.get(node).ok_or_else(|| {
        DataError::Graph(format!("node {node} is missing from the level {level} indexing"))
    })
}

fn check_row_count(csr: &Csr, expected: usize, slot: &str) -> Result<()> {
    if csr.row_count() != expected {
        return Err(DataError::Graph(format!(
            "slot {slot}: graph returned {} feature row(s) for {expected} node(s)",
            csr.row_count()
        )));
    }
    Ok(())
}

fn normalized_weights(neighbors: &[Neighbor], directed: bool) -> Vec<f32> {
    if neighbors.is_empty() {
        return Vec::new();
    }
    let mean = 1.0 / neighbors.len() as f32;
    if !directed {
        return vec![mean; neighbors.len()];
    }
    let total: f32 = neighbors.iter().map(|n| n.weight).sum();
    if total <= 0.0 {
        return vec![mean; neighbors.len()];
    }
    neighbors.iter().map(|n| n.weight / total).collect()
}
