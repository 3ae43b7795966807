//! In-memory result table assembled from fetched batches.

use crate::db::Row;
use crate::error::{ReportError, Result};

/// Rows from one fetch, tagged with the statement's column names.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// All rows of one report, in fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Concatenates batches into one table.
    ///
    /// Returns `None` when there are no batches. Every batch must carry the
    /// same columns.
    pub fn from_batches(batches: Vec<RowBatch>) -> Result<Option<Self>> {
        let mut batches = batches.into_iter();
        let Some(first) = batches.next() else {
            return Ok(None);
        };

        let RowBatch { columns, mut rows } = first;
        for batch in batches {
            if batch.columns != columns {
                return Err(ReportError::internal(format!(
                    "batch columns {:?} differ from {:?}",
                    batch.columns, columns
                )));
            }
            rows.extend(batch.rows);
        }

        Ok(Some(Self { columns, rows }))
    }

    /// Column names, in statement order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in fetch order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Splits the rows into at most `count` contiguous partitions of near-equal size.
    ///
    /// Concatenating the partitions in order yields the original rows.
    pub fn partitions(&self, count: usize) -> Vec<&[Row]> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        let size = self.rows.len().div_ceil(count.max(1));
        self.rows.chunks(size).collect()
    }
}
