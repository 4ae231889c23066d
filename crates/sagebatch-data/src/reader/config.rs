//! Instance reader configuration.
//!
//! A [`ReaderConfig`] can be built from individual key/value options, from a
//! `;`-separated `key=value` string, or from a JSON document. Unknown keys
//! and out-of-range values are rejected.
//!
//! # Example
//!
//! ```
//! use sagebatch_data::reader::ReaderConfig;
//!
//! let config = ReaderConfig::from_kv_str("is_train=1;num_neg=3;num_neighbors=10,5").unwrap();
//! assert!(config.is_train);
//! assert_eq!(config.num_neg, 3);
//! assert_eq!(config.num_neighbors, vec![10, 5]);
//!
//! assert!(ReaderConfig::from_kv_str("unknown_key=1").is_err());
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::info;

use sagebatch_core::{GroupTags, NamespaceId};

use crate::error::{DataError, Result};

/// Whether a reader produces training or inference batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderMode {
    /// Edge records with negatives and labels.
    Train,
    /// Node records with a lookup index.
    Predict,
}

/// Options recognized by the bipartite instance reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Records per batch.
    pub batch: usize,
    /// Training (`true`) or inference (`false`) mode.
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_train: bool,
    /// Negative candidates per positive destination.
    pub num_neg: usize,
    /// Fan-out per hop; empty means seeds only.
    pub num_neighbors: Vec<usize>,
    /// Whether neighbor feature blocks are filled.
    #[serde(deserialize_with = "deserialize_flag")]
    pub use_neigh_feat: bool,
    /// Namespace tag of user nodes.
    pub user_ns_id: NamespaceId,
    /// Namespace tag of item nodes.
    pub item_ns_id: NamespaceId,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch: 256,
            is_train: true,
            num_neg: 5,
            num_neighbors: Vec::new(),
            use_neigh_feat: false,
            user_ns_id: 0,
            item_ns_id: 1,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(DataError::Config(format!("{key} must be 0 or 1, got {other:?}"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| DataError::Config(format!("invalid {key} {value:?}: {e}")))
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(v) => Err(de::Error::custom(format!("expected 0 or 1, got {v}"))),
    }
}

impl ReaderConfig {
    /// Applies one key/value option.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Config` for unknown keys and invalid values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "batch" => {
                let batch = parse_number(key, value)?;
                if batch == 0 {
                    return Err(DataError::Config("batch must be positive".to_string()));
                }
                self.batch = batch;
            }
            "is_train" => self.is_train = parse_flag(key, value)?,
            "num_neg" => {
                let num_neg = parse_number(key, value)?;
                if num_neg == 0 {
                    return Err(DataError::Config("num_neg must be positive".to_string()));
                }
                self.num_neg = num_neg;
            }
            "num_neighbors" => {
                let num_neighbors = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse_number(key, s))
                    .collect::<Result<Vec<usize>>>()?;
                if num_neighbors.contains(&0) {
                    return Err(DataError::Config(
                        "num_neighbors entries must be positive".to_string(),
                    ));
                }
                self.num_neighbors = num_neighbors;
            }
            "use_neigh_feat" => self.use_neigh_feat = parse_flag(key, value)?,
            "user_ns_id" => self.user_ns_id = parse_number(key, value)?,
            "item_ns_id" => self.item_ns_id = parse_number(key, value)?,
            _ => {
                return Err(DataError::Config(format!(
                    "Unexpected config: {key} = {value}."
                )))
            }
        }

        info!("Instance reader argument: {} = {}.", key, value);
        Ok(())
    }

    /// Applies a `;`-separated list of `key=value` options.
    ///
    /// Cross-field constraints are not checked, see [`ReaderConfig::validate`].
    pub fn apply_kv_str(&mut self, s: &str) -> Result<()> {
        for item in s.split(|c| c == ';' || c == '\n').map(str::trim) {
            if item.is_empty() {
                continue;
            }
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| DataError::Config(format!("expected key=value, got {item:?}")))?;
            self.set(key.trim(), value.trim())?;
        }
        Ok(())
    }

    /// Parses a `;`-separated list of `key=value` options on top of the
    /// defaults.
    pub fn from_kv_str(s: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_kv_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints and value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.batch == 0 {
            return Err(DataError::Config("batch must be positive".to_string()));
        }
        if self.num_neg == 0 {
            return Err(DataError::Config("num_neg must be positive".to_string()));
        }
        if self.num_neighbors.contains(&0) {
            return Err(DataError::Config(
                "num_neighbors entries must be positive".to_string(),
            ));
        }
        if self.user_ns_id == self.item_ns_id {
            return Err(DataError::Config(format!(
                "user_ns_id and item_ns_id must differ, both are {}",
                self.user_ns_id
            )));
        }
        Ok(())
    }

    /// Returns the reader mode.
    pub fn mode(&self) -> ReaderMode {
        if self.is_train {
            ReaderMode::Train
        } else {
            ReaderMode::Predict
        }
    }

    /// Returns the configured group tags.
    pub fn group_tags(&self) -> GroupTags {
        GroupTags::new(self.user_ns_id, self.item_ns_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.num_neg, 5);
        assert!(config.num_neighbors.is_empty());
        assert!(!config.use_neigh_feat);
        assert_eq!(config.group_tags(), GroupTags::new(0, 1));
        assert_eq!(config.mode(), ReaderMode::Train);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_set_each_key() {
        let mut config = ReaderConfig::default();
        config.set("batch", "64").unwrap();
        config.set("is_train", "0").unwrap();
        config.set("num_neg", "2").unwrap();
        config.set("num_neighbors", "10, 5").unwrap();
        config.set("use_neigh_feat", "1").unwrap();
        config.set("user_ns_id", "7").unwrap();
        config.set("item_ns_id", "8").unwrap();

        assert_eq!(config.batch, 64);
        assert_eq!(config.mode(), ReaderMode::Predict);
        assert_eq!(config.num_neg, 2);
        assert_eq!(config.num_neighbors, vec![10, 5]);
        assert!(config.use_neigh_feat);
        assert_eq!(config.group_tags(), GroupTags::new(7, 8));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ReaderConfig::default();
        assert!(config.set("is_train", "2").is_err());
        assert!(config.set("num_neg", "0").is_err());
        assert!(config.set("num_neg", "-1").is_err());
        assert!(config.set("num_neighbors", "3,x").is_err());
        assert!(config.set("num_neighbors", "3,0").is_err());
        assert!(config.set("user_ns_id", "70000").is_err());
        assert!(config.set("batch", "0").is_err());
    }

    #[test]
    fn test_rejected_value_keeps_previous() {
        let mut config = ReaderConfig::from_kv_str("batch=16;num_neg=3;num_neighbors=4,2").unwrap();
        assert!(config.set("batch", "0").is_err());
        assert!(config.set("num_neg", "0").is_err());
        assert!(config.set("num_neighbors", "5,0").is_err());
        assert!(config.set("num_neighbors", "5,x").is_err());

        assert_eq!(config.batch, 16);
        assert_eq!(config.num_neg, 3);
        assert_eq!(config.num_neighbors, vec![4, 2]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_key() {
        let mut config = ReaderConfig::default();
        let err = config.set("num_negs", "5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: Unexpected config: num_negs = 5."
        );
    }

    #[test]
    fn test_from_kv_str() {
        let config =
            ReaderConfig::from_kv_str(" is_train=0 ;\nnum_neighbors=4;;user_ns_id=2;item_ns_id=3")
                .unwrap();
        assert!(!config.is_train);
        assert_eq!(config.num_neighbors, vec![4]);
        assert_eq!(config.group_tags(), GroupTags::new(2, 3));

        assert!(ReaderConfig::from_kv_str("num_neg").is_err());
        assert!(ReaderConfig::from_kv_str("user_ns_id=1").is_err());
    }

    #[test]
    fn test_apply_kv_str_overrides() {
        let mut config = ReaderConfig::from_json_str(r#"{"num_neg": 2, "batch": 8}"#).unwrap();
        config.apply_kv_str("num_neg=4").unwrap();
        assert_eq!((config.batch, config.num_neg), (8, 4));

        // swapping tags one key at a time passes through an invalid state
        config.apply_kv_str("user_ns_id=1").unwrap();
        assert!(config.validate().is_err());
        config.apply_kv_str("item_ns_id=0").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_str() {
        let config =
            ReaderConfig::from_json_str(r#"{"is_train": 0, "num_neighbors": [2, 2], "use_neigh_feat": true}"#)
                .unwrap();
        assert!(!config.is_train);
        assert!(config.use_neigh_feat);
        assert_eq!(config.num_neighbors, vec![2, 2]);
        assert_eq!(config.num_neg, 5);

        assert!(ReaderConfig::from_json_str(r#"{"is_train": 3}"#).is_err());
        assert!(ReaderConfig::from_json_str(r#"{"num_negs": 3}"#).is_err());
        assert!(ReaderConfig::from_json_str(r#"{"num_neg": 0}"#).is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_values() {
        let mut config = ReaderConfig::default();
        config.set("num_neighbors", "3").unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ReaderConfig::from_json_str(&json).unwrap(), config);
    }
}
