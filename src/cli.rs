//! Command-line argument parsing for db-reports.
//!
//! Uses clap to parse CLI arguments.

use crate::catalog::DEFAULT_CATALOG_FILE;
use crate::config::{CollisionPolicy, ExportSettings};
use clap::Parser;
use std::path::PathBuf;

/// Run parameterized MySQL reports and export them to CSV.
#[derive(Parser, Debug)]
#[command(name = "db-reports")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Name of the AWS CLI profile used to reach Secrets Manager
    #[arg(long, value_name = "NAME", env = "AWS_PROFILE")]
    pub aws_profile: String,

    /// Name of the secret in AWS Secrets Manager holding the database credentials
    #[arg(long, value_name = "NAME", env = "DB_REPORTS_SECRET_NAME")]
    pub secret_name: String,

    /// AWS region (defaults to the profile's region)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Query catalog file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CATALOG_FILE)]
    pub queries: PathBuf,

    /// Directory report files are written to
    #[arg(long, value_name = "PATH", default_value = "reports")]
    pub reports_dir: PathBuf,

    /// What to do when a report file already exists (overwrite or rename)
    #[arg(long, value_name = "POLICY", default_value = "overwrite")]
    pub on_collision: CollisionPolicy,

    /// Write logs to the state directory log file instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the export settings selected on the command line.
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            reports_dir: self.reports_dir.clone(),
            on_collision: self.on_collision,
            ..ExportSettings::default()
        }
    }
}
