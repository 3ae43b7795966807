//! Error types for db-reports.
//!
//! Defines the main error enum used throughout the application. Only query
//! execution errors are recoverable; everything else ends the process.

use thiserror::Error;

/// Main error type for db-reports operations.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Secret store errors (unknown profile, missing secret, undecodable payload, etc.)
    #[error("Secret error: {0}")]
    Secret(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query catalog errors (missing file, malformed JSON, bad placeholders, etc.)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Query execution errors (syntax errors, bad parameters, lost rows mid-fetch, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// CSV export errors (unwritable reports directory, encoding failures, etc.)
    #[error("Export error: {0}")]
    Export(String),

    /// Console I/O errors.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Creates a secret store error with the given message.
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a catalog error with the given message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Creates a console I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Secret(_) => "Secret Error",
            Self::Connection(_) => "Connection Error",
            Self::Catalog(_) => "Catalog Error",
            Self::Query(_) => "Query Error",
            Self::Export(_) => "Export Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the interactive loop may report this error and carry on.
    ///
    /// The open database session is assumed usable after a failed query.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
