//! Database abstraction layer for db-reports.
//!
//! Provides a trait-based interface for running parameterized queries and
//! reading their results in batches, so the report loop can run against
//! MySQL or an in-memory client.

mod mock;
mod mysql;
mod types;

pub use mock::{ExecutedQuery, FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use types::{ColumnInfo, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Opens the database session described by the configuration.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = MySqlClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a query, binding `params` to its positional markers in order.
    ///
    /// Errors raised by the server while starting the query are returned here
    /// as query errors.
    async fn execute_query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> Result<Box<dyn ResultCursor + 'a>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Forward-only cursor over the rows of an executed query.
#[async_trait]
pub trait ResultCursor: Send {
    /// Columns reported by the executed statement.
    ///
    /// Empty when the statement produced no rows.
    fn columns(&self) -> &[ColumnInfo];

    /// Fetches up to `size` rows. An empty batch means the cursor is exhausted.
    async fn fetch_many(&mut self, size: usize) -> Result<Vec<Row>>;
}
