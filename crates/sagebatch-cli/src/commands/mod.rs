//! CLI Command Implementations
//!
//! - [`scan`]: Read every batch of a set of inputs and summarize them

mod scan;

pub use scan::{SamplerArg, ScanCommand, ScanSummary, ShardSummary};
