//! Unsupervised bipartite GraphSAGE reader.
//!
//! Training batches are read as `src dst` edge records. Every destination
//! gets `num_neg` negatives drawn from the destinations of the same batch.
//! All nodes are split into a user and an item encoder, each of which gets
//! its own sampled subgraph, feature blocks and adjacency blocks. The edges
//! are finally written as flat indices into the concatenated `[users, items]`
//! seed space, positive row first, followed by the negatives.
//!
//! Inference batches are read as single-node records. Both encoders are
//! filled the same way and every input node is mapped to a one-entry row of
//! the `src_id` slot. The negative sampler is never consulted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sagebatch_core::{Csr, FlatIndexer, GroupTags, Indexing, NodeGroup, NodeId};

use super::{InstanceReader, ReaderConfig, ReaderMode, ReaderStats};
use crate::error::{DataError, Result};
use crate::flow::NeighborAggregationFlow;
use crate::graph::GraphClient;
use crate::input::{EdgeRecord, LineParser, NodeRecord};
use crate::instance::Instance;
use crate::negative_sampling::NegativeSampler;
use crate::partition::partition_nodes;
use crate::slots::SlotNames;

/// Per-level indexings of one encoder's subgraph.
struct EncoderIndexings(Vec<Indexing>);

impl EncoderIndexings {
    /// The seed level; [`NeighborAggregationFlow::sample_subgraph`] always
    /// yields it, even for an empty seed list.
    fn seeds(&self) -> &Indexing {
        &self.0[0]
    }
}

/// Reader of user/item bipartite batches.
pub struct UnsupBipartiteReader {
    config: ReaderConfig,
    tags: GroupTags,
    slots: SlotNames,
    flow: NeighborAggregationFlow,
    sampler: Arc<dyn NegativeSampler>,
    parser: LineParser,
    stats: ReaderStats,
}

impl std::fmt::Debug for UnsupBipartiteReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsupBipartiteReader")
            .field("config", &self.config)
            .field("parser", &self.parser)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl UnsupBipartiteReader {
    /// Creates a reader with the default slot names.
    pub fn new(
        config: ReaderConfig,
        graph: Arc<dyn GraphClient>,
        sampler: Arc<dyn NegativeSampler>,
        parser: LineParser,
    ) -> Result<Self> {
        Self::with_slot_names(config, SlotNames::default(), graph, sampler, parser)
    }

    /// Creates a reader writing to custom slot names.
    pub fn with_slot_names(
        config: ReaderConfig,
        slots: SlotNames,
        graph: Arc<dyn GraphClient>,
        sampler: Arc<dyn NegativeSampler>,
        parser: LineParser,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Create bipartite reader: mode {:?}, batch {}, num_neg {}, num_neighbors {:?}, user_ns_id {}, item_ns_id {}",
            config.mode(),
            config.batch,
            config.num_neg,
            config.num_neighbors,
            config.user_ns_id,
            config.item_ns_id
        );
        Ok(Self {
            tags: config.group_tags(),
            config,
            slots,
            flow: NeighborAggregationFlow::new(graph),
            sampler,
            parser,
            stats: ReaderStats::default(),
        })
    }

    /// Returns the slot names this reader writes.
    pub fn slot_names(&self) -> &SlotNames {
        &self.slots
    }

    fn finish(&mut self, inst: &mut Instance) -> bool {
        self.parser.close();
        inst.clear_batch();
        info!(
            "Input exhausted after {} batch(es), {} record(s)",
            self.stats.batches, self.stats.records
        );
        false
    }

    fn get_train_batch(&mut self, inst: &mut Instance) -> Result<bool> {
        let Some(records) = self.parser.next_batch::<EdgeRecord>(self.config.batch)? else {
            return Ok(self.finish(inst));
        };
        let src_nodes: Vec<NodeId> = records.iter().map(|r| r.src).collect();
        let dst_nodes: Vec<NodeId> = records.iter().map(|r| r.dst).collect();

        let neg_nodes_list = self.sample_negatives(&dst_nodes)?;

        let mut user_nodes = Vec::new();
        let mut item_nodes = Vec::new();
        let mut invalid = partition_nodes(&src_nodes, self.tags, &mut user_nodes, &mut item_nodes);
        invalid += partition_nodes(&dst_nodes, self.tags, &mut user_nodes, &mut item_nodes);
        for negs in &neg_nodes_list {
            invalid += partition_nodes(negs, self.tags, &mut user_nodes, &mut item_nodes);
        }

        let user_indexings = self.fill_encoder(inst, NodeGroup::User, &user_nodes)?;
        let item_indexings = self.fill_encoder(inst, NodeGroup::Item, &item_nodes)?;

        let flat = FlatIndexer::new(self.tags, user_indexings.seeds(), item_indexings.seeds());
        let index = |node: NodeId| -> Result<usize> { Ok(flat.index(node)?) };
        self.flow.fill_edge_and_label(
            inst,
            &self.slots.src_id,
            &self.slots.dst_id,
            &self.slots.label,
            &src_nodes,
            &dst_nodes,
            &neg_nodes_list,
            index,
            index,
        )?;

        let rows = inst
            .labels(&self.slots.label)
            .map(<[f32]>::len)
            .unwrap_or_default();
        inst.set_batch_size(records.len());
        self.record_batch(records.len(), rows, invalid);
        debug!(
            "Train batch: {} edge(s), {} row(s), {} user seed(s), {} item seed(s)",
            records.len(),
            rows,
            user_indexings.seeds().size(),
            item_indexings.seeds().size()
        );
        Ok(true)
    }

    fn get_predict_batch(&mut self, inst: &mut Instance) -> Result<bool> {
        let Some(records) = self.parser.next_batch::<NodeRecord>(self.config.batch)? else {
            return Ok(self.finish(inst));
        };
        let src_nodes: Vec<NodeId> = records.iter().map(|r| r.node).collect();

        let mut user_nodes = Vec::new();
        let mut item_nodes = Vec::new();
        let invalid = partition_nodes(&src_nodes, self.tags, &mut user_nodes, &mut item_nodes);

        let user_indexings = self.fill_encoder(inst, NodeGroup::User, &user_nodes)?;
        let item_indexings = self.fill_encoder(inst, NodeGroup::Item, &item_nodes)?;

        let flat = FlatIndexer::new(self.tags, user_indexings.seeds(), item_indexings.seeds());
        let index = build_index(&flat, &src_nodes)?;
        *inst.get_or_insert_csr(&self.slots.src_id) = index;
        *inst.get_or_insert_nodes(&self.slots.predict_node) = src_nodes;

        inst.set_batch_size(records.len());
        self.record_batch(records.len(), records.len(), invalid);
        debug!(
            "Predict batch: {} node(s), {} user seed(s), {} item seed(s)",
            records.len(),
            user_indexings.seeds().size(),
            item_indexings.seeds().size()
        );
        Ok(true)
    }

    /// Draws negatives against the batch destinations.
    fn sample_negatives(&mut self, dst_nodes: &[NodeId]) -> Result<Vec<Vec<NodeId>>> {
        let neg_nodes_list =
            self.sampler
                .sample_negatives(self.config.num_neg, dst_nodes, dst_nodes)?;
        if neg_nodes_list.len() != dst_nodes.len() {
            return Err(DataError::Sampling(format!(
                "sampler returned {} negative list(s) for {} destination(s)",
                neg_nodes_list.len(),
                dst_nodes.len()
            )));
        }

        let mut self_negatives = 0;
        for (&dst, negs) in dst_nodes.iter().zip(&neg_nodes_list) {
            if negs.len() != self.config.num_neg {
                return Err(DataError::Sampling(format!(
                    "sampler returned {} of {} negative(s) for node {}",
                    negs.len(),
                    self.config.num_neg,
                    dst
                )));
            }
            self_negatives += negs.iter().filter(|&&n| n == dst).count();
        }
        if self_negatives > 0 {
            warn!(
                "{} negative(s) equal their positive destination in a batch of {} edge(s)",
                self_negatives,
                dst_nodes.len()
            );
        }
        self.stats.self_negatives += self_negatives;
        Ok(neg_nodes_list)
    }

    /// Samples the subgraph of one encoder and fills its four slots.
    fn fill_encoder(
        &self,
        inst: &mut Instance,
        group: NodeGroup,
        nodes: &[NodeId],
    ) -> Result<EncoderIndexings> {
        let slots = self.slots.encoder(group);
        let (level_nodes, level_neighs) = self
            .flow
            .sample_subgraph(nodes, &self.config.num_neighbors)?;

        self.flow
            .fill_level_node_feature(inst, &slots.node_feature, &level_nodes)?;
        if self.config.use_neigh_feat {
            self.flow
                .fill_level_neigh_feature(inst, &slots.neigh_feature, &level_nodes)?;
        }

        let indexings = Indexing::from_levels(&level_nodes);
        self.flow.fill_self_and_neigh_graph_block(
            inst,
            &slots.self_block,
            &slots.neigh_block,
            &level_nodes,
            &level_neighs,
            &indexings,
            false,
        )?;
        Ok(EncoderIndexings(indexings))
    }

    fn record_batch(&mut self, records: usize, rows: usize, invalid: usize) {
        self.stats.batches += 1;
        self.stats.records += records;
        self.stats.rows += rows;
        self.stats.invalid_nodes += invalid;
    }
}

/// Maps every node to a one-entry row holding its flat index.
fn build_index(flat: &FlatIndexer<'_>, nodes: &[NodeId]) -> Result<Csr> {
    let mut csr = Csr::new();
    for &node in nodes {
        csr.emplace(flat.index(node)? as u64, 1.0);
        csr.add_row();
    }
    Ok(csr)
}

impl InstanceReader for UnsupBipartiteReader {
    fn get_batch(&mut self, inst: &mut Instance) -> Result<bool> {
        inst.clear_batch();
        let result = match self.config.mode() {
            ReaderMode::Train => self.get_train_batch(inst),
            ReaderMode::Predict => self.get_predict_batch(inst),
        };
        if result.is_err() {
            inst.clear_batch();
        }
        result
    }

    fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn stats(&self) -> ReaderStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryGraph;
    use crate::negative_sampling::{SelfExclusion, UniformNegativeSampler};
    use sagebatch_core::make_node;
    use std::io::Cursor;

    fn user(v: u64) -> NodeId {
        make_node(0, v).unwrap()
    }

    fn item(v: u64) -> NodeId {
        make_node(1, v).unwrap()
    }

    fn reader(config: &str, input: String) -> UnsupBipartiteReader {
        let mut graph = InMemoryGraph::new().with_seed(11);
        graph.add_undirected_edge(user(1), item(1), 1.0);
        graph.add_undirected_edge(user(2), item(2), 1.0);
        graph.add_undirected_edge(user(2), item(1), 1.0);
        UnsupBipartiteReader::new(
            ReaderConfig::from_kv_str(config).unwrap(),
            Arc::new(graph),
            Arc::new(UniformNegativeSampler::new().with_seed(7)),
            LineParser::from_reader(Cursor::new(input)),
        )
        .unwrap()
    }

    #[test]
    fn test_train_batch_slots() {
        let input = format!("{} {}\n{} {}\n", user(1), item(1), user(2), item(2));
        let mut reader = reader("num_neg=1;num_neighbors=2;use_neigh_feat=1", input);
        let mut inst = Instance::new();

        assert!(reader.get_batch(&mut inst).unwrap());
        let slots = reader.slot_names().clone();
        for group in NodeGroup::ALL {
            let enc = slots.encoder(group);
            assert!(inst.csr(&enc.node_feature).is_some());
            assert!(inst.csr(&enc.neigh_feature).is_some());
            assert_eq!(inst.csr_list(&enc.self_block).unwrap().len(), 1);
            assert_eq!(inst.csr_list(&enc.neigh_block).unwrap().len(), 1);
        }
        assert_eq!(inst.labels(&slots.label).unwrap(), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(inst.batch_size(), 2);
        assert_eq!(reader.stats().rows, 4);
    }

    #[test]
    fn test_neigh_feature_off_by_default() {
        let input = format!("{} {}\n", user(1), item(1));
        let mut reader = reader("num_neg=1", input);
        let mut inst = Instance::new();
        assert!(reader.get_batch(&mut inst).unwrap());
        assert!(inst.csr(&reader.slot_names().user.neigh_feature).is_none());
        // the lone destination is its own negative
        assert_eq!(inst.labels(&reader.slot_names().label).unwrap(), &[1.0, 0.0]);
        assert_eq!(inst.indices(&reader.slot_names().dst_id).unwrap(), &[1, 1]);
        assert_eq!(reader.stats().self_negatives, 1);
    }

    struct EmptyListSampler;

    impl NegativeSampler for EmptyListSampler {
        fn sample_negatives(
            &self,
            _count: usize,
            _population: &[NodeId],
            queries: &[NodeId],
        ) -> Result<Vec<Vec<NodeId>>> {
            Ok(vec![Vec::new(); queries.len()])
        }

        fn self_exclusion(&self) -> SelfExclusion {
            SelfExclusion::Allow
        }
    }

    #[test]
    fn test_short_negative_list_fails_batch() {
        let mut graph = InMemoryGraph::new();
        graph.add_undirected_edge(user(1), item(1), 1.0);
        let input = format!("{} {}\n", user(1), item(1));
        let mut reader = UnsupBipartiteReader::new(
            ReaderConfig::from_kv_str("num_neg=2").unwrap(),
            Arc::new(graph),
            Arc::new(EmptyListSampler),
            LineParser::from_reader(Cursor::new(input)),
        )
        .unwrap();
        let mut inst = Instance::new();

        let err = reader.get_batch(&mut inst).unwrap_err();
        assert!(matches!(err, DataError::Sampling(_)));
        assert!(inst.is_empty());
        assert_eq!(reader.stats().batches, 0);
    }

    #[test]
    fn test_exhaustion_clears_instance() {
        let input = format!("{}\n", user(1));
        let mut reader = reader("is_train=0", input);
        let mut inst = Instance::new();
        assert!(reader.get_batch(&mut inst).unwrap());
        assert!(!inst.is_empty());

        assert!(!reader.get_batch(&mut inst).unwrap());
        assert!(inst.is_empty());
        assert_eq!(inst.batch_size(), 0);
        assert!(!reader.get_batch(&mut inst).unwrap());
    }

    #[test]
    fn test_build_index_rows() {
        let users = Indexing::build([user(3), user(4)]);
        let items = Indexing::build([item(9)]);
        let flat = FlatIndexer::new(GroupTags::default(), &users, &items);

        let csr = build_index(&flat, &[item(9), user(4)]).unwrap();
        assert_eq!(csr.row_count(), 2);
        assert_eq!(csr.cols(), &[2, 1]);
        assert_eq!(csr.values(), &[1.0, 1.0]);

        assert!(build_index(&flat, &[item(1)]).is_err());
    }
}
