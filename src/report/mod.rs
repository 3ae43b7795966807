//! Report execution and CSV export.
//!
//! Runs one report request end to end: execute the query, fetch its rows in
//! batches, and write them to a CSV file in the reports directory.

mod export;
mod path;
mod table;

pub use export::write_csv;
pub use path::{report_file_name, report_path, resolve_collision, ReportTarget};
pub use table::{ResultTable, RowBatch};

use crate::catalog::QueryDefinition;
use crate::config::ExportSettings;
use crate::db::DatabaseClient;
use crate::error::{ReportError, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One operator-initiated report: a query and its date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub query: QueryDefinition,
    pub start_date: String,
    pub end_date: String,
}

impl ReportRequest {
    /// Creates a request for the given query and dates.
    pub fn new(
        query: QueryDefinition,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            query,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Query parameters, in marker order.
    pub fn params(&self) -> Vec<String> {
        vec![self.start_date.clone(), self.end_date.clone()]
    }

    /// File name of this report.
    pub fn file_name(&self) -> String {
        report_file_name(&self.query.description, &self.start_date, &self.end_date)
    }
}

/// Summary of a written report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
    /// True when an existing file was replaced.
    pub overwrote: bool,
    /// Wall-clock time from query execution through the CSV flush.
    pub elapsed: Duration,
}

/// Result of running a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The query returned no rows; no file was written.
    NoData,
    /// The rows were written to a CSV file.
    Written(ReportSummary),
}

/// Runs a report request against the database and exports its rows.
///
/// Query errors, including ones raised while fetching, are returned as
/// recoverable errors; rows fetched before the failure are discarded.
pub async fn run_report(
    db: &dyn DatabaseClient,
    request: &ReportRequest,
    settings: &ExportSettings,
) -> Result<ReportOutcome> {
    let start = Instant::now();
    let params = request.params();

    info!(
        "Running '{}' for {} to {}",
        request.query.description, request.start_date, request.end_date
    );

    let mut cursor = db.execute_query(&request.query.query, &params).await?;

    let mut batches = Vec::new();
    loop {
        let rows = cursor.fetch_many(settings.batch_size).await?;
        if rows.is_empty() {
            break;
        }
        debug!("Fetched batch {} with {} rows", batches.len() + 1, rows.len());
        batches.push(RowBatch {
            columns: cursor.columns().iter().map(|c| c.name.clone()).collect(),
            rows,
        });
    }
    drop(cursor);

    let Some(table) = ResultTable::from_batches(batches)? else {
        info!("'{}' returned no rows", request.query.description);
        return Ok(ReportOutcome::NoData);
    };

    std::fs::create_dir_all(&settings.reports_dir).map_err(|e| {
        ReportError::export(format!(
            "Failed to create reports directory {}: {e}",
            settings.reports_dir.display()
        ))
    })?;

    let target = resolve_collision(
        settings.reports_dir.join(request.file_name()),
        settings.on_collision,
    );
    if target.overwrites {
        warn!("Overwriting existing report {}", target.path.display());
    }

    let bytes = write_csv(&table, &target.path, settings.partitions)?;
    let elapsed = start.elapsed();

    info!(
        "Wrote {} rows ({} bytes) to {} in {:.2?}",
        table.row_count(),
        bytes,
        target.path.display(),
        elapsed
    );

    Ok(ReportOutcome::Written(ReportSummary {
        path: target.path,
        rows: table.row_count(),
        bytes,
        overwrote: target.overwrites,
        elapsed,
    }))
}
