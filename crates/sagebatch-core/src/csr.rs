//! Compressed sparse row blocks.
//!
//! [`Csr`] is the row-major sparse structure used for feature blocks,
//! adjacency blocks and lookup indices. Rows are built incrementally: entries
//! are appended with [`Csr::emplace`] and the current row is closed with
//! [`Csr::add_row`]. A row closed without entries is an empty row.
//!
//! # Example
//!
//! ```
//! use sagebatch_core::csr::Csr;
//!
//! let mut csr = Csr::new();
//! csr.emplace(3, 1.0);
//! csr.emplace(5, 0.5);
//! csr.add_row();
//! csr.add_row();
//!
//! assert_eq!(csr.row_count(), 2);
//! assert_eq!(csr.row(0), Some((&[3u64, 5][..], &[1.0f32, 0.5][..])));
//! assert_eq!(csr.row(1).map(|(cols, _)| cols.len()), Some(0));
//! ```

use serde::{Deserialize, Serialize};

/// A compressed sparse row matrix with `u64` columns and `f32` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Csr {
    row_offset: Vec<usize>,
    col: Vec<u64>,
    value: Vec<f32>,
}

impl Default for Csr {
    fn default() -> Self {
        Self::new()
    }
}

impl Csr {
    /// Creates an empty matrix with no rows.
    pub fn new() -> Self {
        Self {
            row_offset: vec![0],
            col: Vec::new(),
            value: Vec::new(),
        }
    }

    /// Appends an entry to the row under construction.
    #[inline]
    pub fn emplace(&mut self, col: u64, value: f32) {
        self.col.push(col);
        self.value.push(value);
    }

    /// Closes the row under construction.
    #[inline]
    pub fn add_row(&mut self) {
        self.row_offset.push(self.col.len());
    }

    /// Returns the number of closed rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_offset.len() - 1
    }

    /// Returns the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col.len()
    }

    /// Returns `true` if the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Returns the columns and values of row `i`.
    pub fn row(&self, i: usize) -> Option<(&[u64], &[f32])> {
        if i >= self.row_count() {
            return None;
        }
        let (begin, end) = (self.row_offset[i], self.row_offset[i + 1]);
        Some((&self.col[begin..end], &self.value[begin..end]))
    }

    /// Iterates over closed rows.
    pub fn rows(&self) -> impl Iterator<Item = (&[u64], &[f32])> {
        self.row_offset.windows(2).map(move |w| {
            let (begin, end) = (w[0], w[1]);
            (&self.col[begin..end], &self.value[begin..end])
        })
    }

    /// Returns the row offsets (`row_count() + 1` entries).
    pub fn row_offset(&self) -> &[usize] {
        &self.row_offset
    }

    /// Returns all columns in row-major order.
    pub fn cols(&self) -> &[u64] {
        &self.col
    }

    /// Returns all values in row-major order.
    pub fn values(&self) -> &[f32] {
        &self.value
    }

    /// Removes all rows and entries.
    pub fn clear(&mut self) {
        self.row_offset.clear();
        self.row_offset.push(0);
        self.col.clear();
        self.value.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let csr = Csr::new();
        assert!(csr.is_empty());
        assert_eq!(csr.row_count(), 0);
        assert_eq!(csr.nnz(), 0);
        assert_eq!(csr.row(0), None);
        assert_eq!(csr, Csr::default());
    }

    #[test]
    fn test_rows_and_offsets() {
        let mut csr = Csr::new();
        csr.emplace(1, 1.0);
        csr.add_row();
        csr.add_row();
        csr.emplace(2, 0.25);
        csr.emplace(4, 0.75);
        csr.add_row();

        assert_eq!(csr.row_count(), 3);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.row_offset(), &[0, 1, 1, 3]);

        let rows: Vec<_> = csr.rows().map(|(c, _)| c.to_vec()).collect();
        assert_eq!(rows, vec![vec![1], vec![], vec![2, 4]]);
        assert_eq!(csr.row(2).unwrap().1, &[0.25, 0.75]);
    }

    #[test]
    fn test_clear() {
        let mut csr = Csr::new();
        csr.emplace(9, 1.0);
        csr.add_row();
        csr.clear();
        assert_eq!(csr, Csr::new());
    }

    #[test]
    fn test_serde_shape() {
        let mut csr = Csr::new();
        csr.emplace(7, 1.0);
        csr.add_row();
        let json = serde_json::to_value(&csr).unwrap();
        assert_eq!(json["row_offset"], serde_json::json!([0, 1]));
        assert_eq!(json["col"], serde_json::json!([7]));
    }
}
