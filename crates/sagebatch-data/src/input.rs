//! Raw input records and the line-oriented batch source.
//!
//! Training input holds one edge per line (`src dst`), inference input one
//! node per line. Blank lines and lines starting with `#` are ignored;
//! malformed lines are logged and skipped.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use sagebatch_data::input::{EdgeRecord, LineParser};
//!
//! let mut parser = LineParser::from_reader(Cursor::new("1 2\n3 4\n5 6\n"));
//! let first = parser.next_batch::<EdgeRecord>(2).unwrap().unwrap();
//! assert_eq!(first, vec![EdgeRecord::new(1, 2), EdgeRecord::new(3, 4)]);
//!
//! let second = parser.next_batch::<EdgeRecord>(2).unwrap().unwrap();
//! assert_eq!(second.len(), 1);
//! assert!(parser.next_batch::<EdgeRecord>(2).unwrap().is_none());
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sagebatch_core::NodeId;

use crate::error::Result;

/// A record type that can be parsed from one text line.
pub trait FromLine: Sized {
    /// Parses the whitespace-separated fields of a line.
    ///
    /// Returns a human-readable reason on failure.
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String>;
}

fn parse_node(field: &str) -> std::result::Result<NodeId, String> {
    field
        .parse::<NodeId>()
        .map_err(|e| format!("invalid node id {field:?}: {e}"))
}

/// A training edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Source node.
    pub src: NodeId,
    /// Destination node.
    pub dst: NodeId,
}

impl EdgeRecord {
    /// Creates an edge record.
    pub fn new(src: NodeId, dst: NodeId) -> Self {
        Self { src, dst }
    }
}

impl FromLine for EdgeRecord {
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        match fields {
            [src, dst, ..] => Ok(Self::new(parse_node(src)?, parse_node(dst)?)),
            _ => Err(format!("expected `src dst`, got {} field(s)", fields.len())),
        }
    }
}

/// An inference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The node to embed.
    pub node: NodeId,
}

impl NodeRecord {
    /// Creates a node record.
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl FromLine for NodeRecord {
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        match fields {
            [node, ..] => Ok(Self::new(parse_node(node)?)),
            [] => Err("expected `node`".to_string()),
        }
    }
}

/// Reads records in fixed-size batches from a line-oriented source.
///
/// Once the underlying reader is exhausted the parser closes it and every
/// later call reports exhaustion.
pub struct LineParser {
    reader: Option<Box<dyn BufRead + Send>>,
    line_no: usize,
    skipped: usize,
    buf: String,
}

impl std::fmt::Debug for LineParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineParser")
            .field("open", &self.reader.is_some())
            .field("line_no", &self.line_no)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl LineParser {
    /// Wraps any buffered reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            reader: Some(Box::new(reader)),
            line_no: 0,
            skipped: 0,
            buf: String::new(),
        }
    }

    /// Opens a text file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        info!("Open input file: {}", path.as_ref().display());
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Reads up to `batch_size` records.
    ///
    /// Returns `Ok(None)` when no record is left. A short batch is returned
    /// as-is.
    pub fn next_batch<R: FromLine>(&mut self, batch_size: usize) -> Result<Option<Vec<R>>> {
        let mut records = Vec::with_capacity(batch_size);
        while records.len() < batch_size {
            let Some(reader) = self.reader.as_mut() else {
                break;
            };
            self.buf.clear();
            if reader.read_line(&mut self.buf)? == 0 {
                self.close();
                break;
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            match R::from_fields(&fields) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    self.skipped += 1;
                    warn!("Skip line {}: {}", self.line_no, reason);
                }
            }
        }

        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records))
        }
    }

    /// Releases the underlying reader.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            info!(
                "Close input after {} line(s), {} skipped",
                self.line_no, self.skipped
            );
        }
    }

    /// Returns true until the source has been exhausted or closed.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Returns the number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
