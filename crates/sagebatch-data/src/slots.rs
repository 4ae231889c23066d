//! Slot names of the output batch.
//!
//! Per-encoder slots are named by concatenating a semantic prefix with the
//! encoder name. The names are resolved once into a [`SlotNames`] value when a
//! reader is built and then passed by reference through the pipeline.

use serde::{Deserialize, Serialize};

use sagebatch_core::NodeGroup;

/// Encoder name of the user tower.
pub const USER_ENCODER_NAME: &str = "USER_ENCODER_NAME";
/// Encoder name of the item tower.
pub const ITEM_ENCODER_NAME: &str = "ITEM_ENCODER_NAME";

/// Prefix of node feature slots.
pub const NODE_FEATURE_PREFIX: &str = "node_feature";
/// Prefix of neighbor feature slots.
pub const NEIGH_FEATURE_PREFIX: &str = "neigh_feature";
/// Prefix of self block slots.
pub const SELF_BLOCK_PREFIX: &str = "self_block";
/// Prefix of neighbor block slots.
pub const NEIGH_BLOCK_PREFIX: &str = "neigh_block";

/// Slot of source indices.
pub const SRC_ID_NAME: &str = "src_id";
/// Slot of destination indices.
pub const DST_ID_NAME: &str = "dst_id";
/// Slot of edge labels.
pub const LABEL_NAME: &str = "Y";
/// Slot of raw predict nodes.
pub const PREDICT_NODE_NAME: &str = "predict_node";

/// The four slots filled for one encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSlots {
    /// Node feature block.
    pub node_feature: String,
    /// Neighbor feature block.
    pub neigh_feature: String,
    /// Per-hop self blocks.
    pub self_block: String,
    /// Per-hop neighbor blocks.
    pub neigh_block: String,
}

impl EncoderSlots {
    /// Derives the slot names of `encoder_name`.
    pub fn for_encoder(encoder_name: &str) -> Self {
        Self {
            node_feature: format!("{NODE_FEATURE_PREFIX}{encoder_name}"),
            neigh_feature: format!("{NEIGH_FEATURE_PREFIX}{encoder_name}"),
            self_block: format!("{SELF_BLOCK_PREFIX}{encoder_name}"),
            neigh_block: format!("{NEIGH_BLOCK_PREFIX}{encoder_name}"),
        }
    }
}

/// Every slot name a bipartite reader writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotNames {
    /// Slots of the user encoder.
    pub user: EncoderSlots,
    /// Slots of the item encoder.
    pub item: EncoderSlots,
    /// Source index slot.
    pub src_id: String,
    /// Destination index slot.
    pub dst_id: String,
    /// Label slot.
    pub label: String,
    /// Raw predict node slot.
    pub predict_node: String,
}

impl Default for SlotNames {
    fn default() -> Self {
        Self::with_encoders(USER_ENCODER_NAME, ITEM_ENCODER_NAME)
    }
}

impl SlotNames {
    /// Builds slot names for custom encoder names and the default global slots.
    pub fn with_encoders(user_encoder: &str, item_encoder: &str) -> Self {
        Self {
            user: EncoderSlots::for_encoder(user_encoder),
            item: EncoderSlots::for_encoder(item_encoder),
            src_id: SRC_ID_NAME.to_string(),
            dst_id: DST_ID_NAME.to_string(),
            label: LABEL_NAME.to_string(),
            predict_node: PREDICT_NODE_NAME.to_string(),
        }
    }

    /// Returns the slots of the encoder serving `group`.
    pub fn encoder(&self, group: NodeGroup) -> &EncoderSlots {
        match group {
            NodeGroup::User => &self.user,
            NodeGroup::Item => &self.item,
        }
    }
}
