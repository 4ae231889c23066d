//! The batch container handed to the encoder.
//!
//! An [`Instance`] is a mutable map from slot names to [`SlotValue`]s plus a
//! batch size. One instance is reused across batches: readers clear it at the
//! start of every build and overwrite slots in place.
//!
//! # Example
//!
//! ```
//! use sagebatch_data::instance::Instance;
//!
//! let mut inst = Instance::new();
//! let csr = inst.get_or_insert_csr("src_id");
//! csr.emplace(0, 1.0);
//! csr.add_row();
//! inst.set_batch_size(1);
//!
//! assert_eq!(inst.csr("src_id").map(|c| c.row_count()), Some(1));
//!
//! inst.clear_batch();
//! assert!(inst.is_empty());
//! assert_eq!(inst.batch_size(), 0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sagebatch_core::{Csr, NodeId};

// =============================================================================
// Slot Values
// =============================================================================

/// The value stored in one named slot of an [`Instance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SlotValue {
    /// A single sparse block.
    Csr(Csr),
    /// One sparse block per hop.
    CsrList(Vec<Csr>),
    /// Compacted indices.
    Indices(Vec<usize>),
    /// Raw node identifiers.
    Nodes(Vec<NodeId>),
    /// Float labels.
    Labels(Vec<f32>),
}

impl SlotValue {
    /// Returns the number of top-level elements (rows, blocks or entries).
    pub fn len(&self) -> usize {
        match self {
            SlotValue::Csr(v) => v.row_count(),
            SlotValue::CsrList(v) => v.len(),
            SlotValue::Indices(v) => v.len(),
            SlotValue::Nodes(v) => v.len(),
            SlotValue::Labels(v) => v.len(),
        }
    }

    /// Returns true if the value holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tries to get this value as a sparse block.
    pub fn as_csr(&self) -> Option<&Csr> {
        match self {
            SlotValue::Csr(v) => Some(v),
            _ => None,
        }
    }

    /// Tries to get this value as a list of sparse blocks.
    pub fn as_csr_list(&self) -> Option<&[Csr]> {
        match self {
            SlotValue::CsrList(v) => Some(v),
            _ => None,
        }
    }

    /// Tries to get this value as compacted indices.
    pub fn as_indices(&self) -> Option<&[usize]> {
        match self {
            SlotValue::Indices(v) => Some(v),
            _ => None,
        }
    }

    /// Tries to get this value as raw node identifiers.
    pub fn as_nodes(&self) -> Option<&[NodeId]> {
        match self {
            SlotValue::Nodes(v) => Some(v),
            _ => None,
        }
    }

    /// Tries to get this value as labels.
    pub fn as_labels(&self) -> Option<&[f32]> {
        match self {
            SlotValue::Labels(v) => Some(v),
            _ => None,
        }
    }
}

// Generates `get_or_insert_*` accessors. A slot holding a different kind is
// replaced by an empty value of the requested kind.
macro_rules! get_or_insert_slot {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $fn_name(&mut self, name: &str) -> &mut $ty {
            let slot = self
                .slots
                .entry(name.to_string())
                .or_insert_with(|| SlotValue::$variant(Default::default()));
            if !matches!(slot, SlotValue::$variant(_)) {
                *slot = SlotValue::$variant(Default::default());
            }
            match slot {
                SlotValue::$variant(v) => v,
                _ => unreachable!("slot kind was set above"),
            }
        }
    };
}

// =============================================================================
// Instance
// =============================================================================

/// A batch under construction, keyed by slot name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    slots: BTreeMap<String, SlotValue>,
    batch_size: usize,
}

impl Instance {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in the current batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sets the number of records in the current batch.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    /// Drops every slot and resets the batch size.
    pub fn clear_batch(&mut self) {
        self.slots.clear();
        self.batch_size = 0;
    }

    /// Returns the number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot is populated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if a slot named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Returns the slot names in sorted order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Returns the raw value of a slot.
    pub fn get(&self, name: &str) -> Option<&SlotValue> {
        self.slots.get(name)
    }

    /// Stores `value` under `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: SlotValue) {
        self.slots.insert(name.into(), value);
    }

    /// Removes a slot and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<SlotValue> {
        self.slots.remove(name)
    }

    get_or_insert_slot!(
        /// Returns the sparse block stored under `name`, inserting an empty one.
        get_or_insert_csr,
        Csr,
        Csr
    );

    get_or_insert_slot!(
        /// Returns the block list stored under `name`, inserting an empty one.
        get_or_insert_csr_list,
        CsrList,
        Vec<Csr>
    );

    get_or_insert_slot!(
        /// Returns the index array stored under `name`, inserting an empty one.
        get_or_insert_indices,
        Indices,
        Vec<usize>
    );

    get_or_insert_slot!(
        /// Returns the node list stored under `name`, inserting an empty one.
        get_or_insert_nodes,
        Nodes,
        Vec<NodeId>
    );

    get_or_insert_slot!(
        /// Returns the label array stored under `name`, inserting an empty one.
        get_or_insert_labels,
        Labels,
        Vec<f32>
    );

    /// Returns the sparse block stored under `name`.
    pub fn csr(&self, name: &str) -> Option<&Csr> {
        self.get(name).and_then(SlotValue::as_csr)
    }

    /// Returns the block list stored under `name`.
    pub fn csr_list(&self, name: &str) -> Option<&[Csr]> {
        self.get(name).and_then(SlotValue::as_csr_list)
    }

    /// Returns the index array stored under `name`.
    pub fn indices(&self, name: &str) -> Option<&[usize]> {
        self.get(name).and_then(SlotValue::as_indices)
    }

    /// Returns the node list stored under `name`.
    pub fn nodes(&self, name: &str) -> Option<&[NodeId]> {
        self.get(name).and_then(SlotValue::as_nodes)
    }

    /// Returns the label array stored under `name`.
    pub fn labels(&self, name: &str) -> Option<&[f32]> {
        self.get(name).and_then(SlotValue::as_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_reuses_slot() {
        let mut inst = Instance::new();
        inst.get_or_insert_indices("src").push(3);
        inst.get_or_insert_indices("src").push(4);
        assert_eq!(inst.indices("src"), Some(&[3usize, 4][..]));
        assert_eq!(inst.len(), 1);
    }

    #[test]
    fn test_get_or_insert_replaces_other_kind() {
        let mut inst = Instance::new();
        inst.get_or_insert_labels("y").push(1.0);
        inst.get_or_insert_nodes("y").push(7);

        assert_eq!(inst.labels("y"), None);
        assert_eq!(inst.nodes("y"), Some(&[7u64][..]));
    }

    #[test]
    fn test_typed_getters_reject_other_kinds() {
        let mut inst = Instance::new();
        inst.insert("blocks", SlotValue::CsrList(vec![Csr::new(), Csr::new()]));

        assert!(inst.csr("blocks").is_none());
        assert_eq!(inst.csr_list("blocks").map(<[Csr]>::len), Some(2));
        assert_eq!(inst.get("blocks").map(SlotValue::len), Some(2));
        assert!(inst.get("missing").is_none());
    }

    #[test]
    fn test_clear_batch() {
        let mut inst = Instance::new();
        inst.get_or_insert_csr("a").add_row();
        inst.get_or_insert_labels("b").push(0.0);
        inst.set_batch_size(4);

        inst.clear_batch();
        assert!(inst.is_empty());
        assert_eq!(inst.batch_size(), 0);
        assert!(!inst.contains("a"));
    }

    #[test]
    fn test_slot_names_sorted() {
        let mut inst = Instance::new();
        inst.insert("zeta", SlotValue::Labels(vec![]));
        inst.insert("alpha", SlotValue::Nodes(vec![]));
        let names: Vec<_> = inst.slot_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_json_shape() {
        let mut inst = Instance::new();
        inst.insert("predict_node", SlotValue::Nodes(vec![1, 2]));
        inst.set_batch_size(2);
        let json = serde_json::to_value(&inst).unwrap();
        assert_eq!(json["batch_size"], 2);
        assert_eq!(json["slots"]["predict_node"]["kind"], "nodes");
        assert_eq!(json["slots"]["predict_node"]["data"], serde_json::json!([1, 2]));
    }
}
