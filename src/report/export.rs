//! Partitioned CSV writer.
//!
//! The table is split into partitions that are encoded concurrently on the
//! rayon pool, then written to a single file in partition order.

use super::table::ResultTable;
use crate::db::{Row, Value};
use crate::error::{ReportError, Result};
use csv::{QuoteStyle, WriterBuilder};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Writes the table to `path` as CSV with a header row and no index column.
///
/// Returns the number of bytes written.
pub fn write_csv(table: &ResultTable, path: &Path, partitions: usize) -> Result<u64> {
    let parts = table.partitions(partitions);
    debug!(
        "Encoding {} rows in {} partitions",
        table.row_count(),
        parts.len()
    );

    let encoded = parts
        .par_iter()
        .map(|rows| encode_rows(rows))
        .collect::<Result<Vec<Vec<u8>>>>()?;

    let header = encode_record(table.columns().iter().map(String::as_str))?;

    let file = File::create(path).map_err(|e| {
        ReportError::export(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut out = BufWriter::with_capacity(128 * 1024, file);

    let mut bytes = 0u64;
    for chunk in std::iter::once(&header).chain(encoded.iter()) {
        out.write_all(chunk)
            .map_err(|e| ReportError::export(format!("Failed to write {}: {e}", path.display())))?;
        bytes += chunk.len() as u64;
    }
    out.flush()
        .map_err(|e| ReportError::export(format!("Failed to write {}: {e}", path.display())))?;

    Ok(bytes)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new())
}

fn encode_record<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<Vec<u8>> {
    let mut wtr = csv_writer();
    wtr.write_record(fields)
        .map_err(|e| ReportError::export(e.to_string()))?;
    wtr.into_inner()
        .map_err(|e| ReportError::export(e.to_string()))
}

fn encode_rows(rows: &[Row]) -> Result<Vec<u8>> {
    let mut wtr = csv_writer();
    for row in rows {
        wtr.write_record(row.iter().map(Value::to_csv_field))
            .map_err(|e| ReportError::export(e.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| ReportError::export(e.to_string()))
}
