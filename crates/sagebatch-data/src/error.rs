//! Error types for the instance construction pipeline.

use thiserror::Error;

use sagebatch_core::SageError;

/// Errors that can occur while building batches.
#[derive(Debug, Error)]
pub enum DataError {
    /// Error reading input or graph files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a JSON configuration.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Error parsing a text record.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// One-based line number within the source.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Unrecognized or out-of-range configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The graph service failed to answer a query.
    #[error("graph error: {0}")]
    Graph(String),

    /// The negative sampler could not honor a request.
    #[error("negative sampling error: {0}")]
    Sampling(String),

    /// A node identity or indexing invariant was violated.
    #[error(transparent)]
    Core(#[from] SageError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, DataError>;
