//! Runtime configuration for db-reports.
//!
//! Holds the database connection settings derived from the secret store and
//! the settings that shape report export.

use crate::secrets::CredentialBundle;
use sqlx::mysql::MySqlConnectOptions;
use std::fmt;
use std::path::PathBuf;

/// Default MySQL port, used when a credential bundle carries none.
pub const DEFAULT_PORT: u16 = 3306;

/// Rows requested per fetch from the database.
pub const FETCH_BATCH_SIZE: usize = 1000;

/// Number of partitions the result table is split into for CSV encoding.
pub const EXPORT_PARTITIONS: usize = 10;

/// Database connection configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port.
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Database user.
    pub user: String,

    /// Database password.
    pub password: String,
}

impl ConnectionConfig {
    /// Builds a connection config from credentials fetched from the secret store.
    pub fn from_credentials(credentials: &CredentialBundle) -> Self {
        Self {
            host: credentials.host.clone(),
            port: credentials.port,
            database: credentials.dbname.clone(),
            user: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }

    /// Converts the config into sqlx connect options.
    ///
    /// Options are built field by field so passwords containing URL
    /// metacharacters need no escaping.
    pub fn to_connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Returns a display-safe string (no password) for log and console output.
    pub fn display_string(&self) -> String {
        format!(
            "{} @ {}:{} as {}",
            self.database, self.host, self.port, self.user
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to do when a report file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Replace the existing file, with a warning.
    #[default]
    Overwrite,
    /// Write to the first free `{stem}_{n}.csv` instead.
    Rename,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            _ => Err(format!(
                "Invalid collision policy: {s}. Expected: overwrite or rename"
            )),
        }
    }
}

/// Settings for the fetch-and-export pipeline.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Directory report files are written to (created on demand).
    pub reports_dir: PathBuf,

    /// Rows requested per fetch.
    pub batch_size: usize,

    /// Partitions used when encoding the CSV.
    pub partitions: usize,

    /// Behavior when the report file already exists.
    pub on_collision: CollisionPolicy,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            batch_size: FETCH_BATCH_SIZE,
            partitions: EXPORT_PARTITIONS,
            on_collision: CollisionPolicy::default(),
        }
    }
}

impl ExportSettings {
    /// Returns settings writing into the given directory, other fields default.
    pub fn with_reports_dir(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            ..Self::default()
        }
    }
}
