//! Sagebatch CLI Library
//!
//! Command-line driver for the sagebatch instance readers.
//!
//! # Example
//!
//! ```bash
//! # Read all batches of two shards and print a summary
//! sagebatch scan --graph edges.txt --input part-0.txt --input part-1.txt \
//!     --config "num_neg=5;num_neighbors=10,5" --workers 2
//!
//! # Inference mode, dumping the first batch for inspection
//! sagebatch scan --graph edges.txt --input nodes.txt \
//!     --config "is_train=0;num_neighbors=10" --dump-first batch.json
//! ```

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{SamplerArg, ScanCommand, ScanSummary, ShardSummary};

/// Sagebatch - bipartite GraphSAGE batch construction
#[derive(Parser, Debug)]
#[command(name = "sagebatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read every batch of the given inputs and print a summary
    Scan(ScanCommand),
}

/// Result type alias for CLI operations
pub type CliResult<T> = anyhow::Result<T>;
