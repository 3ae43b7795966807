//! Mock database clients for testing.
//!
//! Provides in-memory implementations that return canned result sets and
//! record what was executed, so the report loop can be tested without MySQL.

use super::{ColumnInfo, DatabaseClient, ResultCursor, Row};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A query as seen by the mock client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone)]
enum MockResponse {
    Rows {
        columns: Vec<ColumnInfo>,
        rows: Vec<Row>,
        /// Fetches that succeed before the cursor fails with this message.
        fail_after: Option<(usize, String)>,
    },
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, MockResponse>,
    executed: Vec<ExecutedQuery>,
    fetch_sizes: Vec<usize>,
    closed: bool,
}

/// A mock database client that returns predefined results keyed by SQL text.
///
/// Clones share state, so a test can keep a handle after giving the client
/// to a session.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseClient {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabaseClient {
    /// Creates a mock client with no canned results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result set returned for `sql`.
    pub fn with_result(self, sql: impl Into<String>, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        self.lock()
            .responses
            .insert(
                sql.into(),
                MockResponse::Rows {
                    columns,
                    rows,
                    fail_after: None,
                },
            );
        self
    }

    /// Makes the cursor for `sql` fail once `batches` fetches have succeeded.
    ///
    /// Has no effect unless a result was registered for `sql`.
    pub fn with_fetch_error_after(
        self,
        sql: &str,
        batches: usize,
        message: impl Into<String>,
    ) -> Self {
        {
            let mut state = self.lock();
            if let Some(MockResponse::Rows { fail_after, .. }) = state.responses.get_mut(sql) {
                *fail_after = Some((batches, message.into()));
            }
        }
        self
    }

    /// Registers an execution error returned for `sql`.
    pub fn with_error(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock()
            .responses
            .insert(sql.into(), MockResponse::Error(message.into()));
        self
    }

    /// Returns every query executed so far, in order.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.lock().executed.clone()
    }

    /// Returns the `size` argument of every fetch, in order.
    pub fn fetch_sizes(&self) -> Vec<usize> {
        self.lock().fetch_sizes.clone()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> Result<Box<dyn ResultCursor + 'a>> {
        let response = {
            let mut state = self.lock();
            if state.closed {
                return Err(ReportError::connection("connection is closed"));
            }
            state.executed.push(ExecutedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
            state.responses.get(sql).cloned()
        };

        match response {
            Some(MockResponse::Rows {
                columns,
                rows,
                fail_after,
            }) => {
                let columns = if rows.is_empty() { Vec::new() } else { columns };
                Ok(Box::new(MockCursor {
                    columns,
                    rows: rows.into_iter(),
                    fetches: 0,
                    fail_after,
                    client: self,
                }))
            }
            Some(MockResponse::Error(message)) => Err(ReportError::query(message)),
            None => Err(ReportError::query(format!(
                "ERROR 1146 (42S02): no mock result for query: {sql}"
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}

struct MockCursor<'a> {
    columns: Vec<ColumnInfo>,
    rows: std::vec::IntoIter<Row>,
    fetches: usize,
    fail_after: Option<(usize, String)>,
    client: &'a MockDatabaseClient,
}

#[async_trait]
impl ResultCursor for MockCursor<'_> {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn fetch_many(&mut self, size: usize) -> Result<Vec<Row>> {
        self.client.lock().fetch_sizes.push(size);
        if let Some((batches, message)) = &self.fail_after {
            if self.fetches >= *batches {
                return Err(ReportError::query(message.clone()));
            }
        }
        self.fetches += 1;
        Ok(self.rows.by_ref().take(size.max(1)).collect())
    }
}

/// A database client whose queries always fail.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing every query with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query<'a>(
        &'a self,
        _sql: &'a str,
        _params: &'a [String],
    ) -> Result<Box<dyn ResultCursor + 'a>> {
        Err(ReportError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
