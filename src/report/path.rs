//! Report file naming.
//!
//! A report is named `{description}_{start_date}_{end_date}.csv` inside the
//! reports directory. Characters that could leave that directory are replaced.

use crate::config::CollisionPolicy;
use std::path::{Path, PathBuf};

/// Replaces path separators and control characters with `_`.
fn sanitize_component(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Returns the report file name for a description and date range.
pub fn report_file_name(description: &str, start_date: &str, end_date: &str) -> String {
    format!(
        "{}_{}_{}.csv",
        sanitize_component(description),
        sanitize_component(start_date),
        sanitize_component(end_date)
    )
}

/// Returns the report path inside `reports_dir`.
pub fn report_path(reports_dir: &Path, description: &str, start_date: &str, end_date: &str) -> PathBuf {
    reports_dir.join(report_file_name(description, start_date, end_date))
}

/// Where a report will be written, after applying the collision policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub path: PathBuf,
    /// True when an existing file will be replaced.
    pub overwrites: bool,
}

/// Applies the collision policy to a candidate report path.
pub fn resolve_collision(path: PathBuf, policy: CollisionPolicy) -> ReportTarget {
    if !path.exists() {
        return ReportTarget {
            path,
            overwrites: false,
        };
    }

    match policy {
        CollisionPolicy::Overwrite => ReportTarget {
            path,
            overwrites: true,
        },
        CollisionPolicy::Rename => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

            let free = (1u32..)
                .map(|n| parent.join(format!("{stem}_{n}.csv")))
                .find(|candidate| !candidate.exists())
                .unwrap_or(path);

            ReportTarget {
                path: free,
                overwrites: false,
            }
        }
    }
}
