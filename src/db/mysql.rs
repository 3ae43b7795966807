//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! for MySQL databases using sqlx. The pool holds a single connection, which
//! is the one database session of the process.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, ResultCursor, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySql, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::chrono::{NaiveDate, NaiveDateTime};
use sqlx::types::BigDecimal;
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Creates a new MySqlClient from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects to the database, retrying transient network failures.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = config.to_connect_options();

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = MySqlPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Duration::from_secs(10))
                .connect_with(options.clone())
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => map_connection_error(e, config),
            None => ReportError::connection("no connection attempt was made"),
        })
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute_query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> Result<Box<dyn ResultCursor + 'a>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }

        let mut stream = query.fetch(&self.pool);

        // The server reports statement errors with the first row, so pull it
        // now to surface them from execute_query.
        let first = stream
            .try_next()
            .await
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        let columns = first.as_ref().map(column_info).unwrap_or_default();

        Ok(Box::new(MySqlCursor {
            stream,
            columns,
            pending: first,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Cursor over a streaming MySQL result set.
struct MySqlCursor<'a> {
    stream: BoxStream<'a, std::result::Result<MySqlRow, sqlx::Error>>,
    columns: Vec<ColumnInfo>,
    pending: Option<MySqlRow>,
}

#[async_trait]
impl ResultCursor for MySqlCursor<'_> {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn fetch_many(&mut self, size: usize) -> Result<Vec<Row>> {
        let size = size.max(1);
        let mut rows = Vec::with_capacity(size);

        if let Some(row) = self.pending.take() {
            rows.push(convert_row(&row)?);
        }

        while rows.len() < size {
            let next = self
                .stream
                .try_next()
                .await
                .map_err(|e| ReportError::query(format_query_error(e)))?;

            match next {
                Some(row) => rows.push(convert_row(&row)?),
                None => break,
            }
        }

        Ok(rows)
    }
}

fn column_info(row: &MySqlRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
///
/// A value that cannot be decoded is a query error, never an empty cell.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    let type_name = type_name.to_uppercase();

    let value = match type_name.as_str() {
        "NULL" => Value::Null,

        // TINYINT(1) holds any tinyint, not only 0 and 1
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(decode::<i64>(row, index)?)
        }

        "YEAR" => unsigned_value(decode_unchecked::<u64>(row, index)?),

        t if t.ends_with("UNSIGNED") => unsigned_value(decode::<u64>(row, index)?),

        "FLOAT" => Value::from(decode::<f32>(row, index)?),

        "DOUBLE" => Value::from(decode::<f64>(row, index)?),

        "DECIMAL" => Value::from(decode::<BigDecimal>(row, index)?.map(|v| v.to_string())),

        "DATE" => Value::from(decode::<NaiveDate>(row, index)?.map(|v| v.to_string())),

        "DATETIME" | "TIMESTAMP" => {
            Value::from(decode::<NaiveDateTime>(row, index)?.map(|v| v.to_string()))
        }

        // Durations may be negative or exceed 24 hours
        "TIME" => Value::from(decode::<MySqlTime>(row, index)?.map(|v| v.to_string())),

        "JSON" => Value::from(decode::<serde_json::Value>(row, index)?.map(|v| v.to_string())),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            Value::from(decode::<Vec<u8>>(row, index)?)
        }

        // sqlx has no checked byte decoding for these
        "BIT" | "GEOMETRY" => Value::from(decode_unchecked::<Vec<u8>>(row, index)?),

        // Text, ENUM, SET and anything unrecognized
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(v) => Value::from(v),
            Err(_) => match decode_unchecked::<Vec<u8>>(row, index)? {
                Some(bytes) => match String::from_utf8(bytes) {
                    Ok(s) => Value::String(s),
                    Err(e) => Value::Bytes(e.into_bytes()),
                },
                None => Value::Null,
            },
        },
    };

    Ok(value)
}

/// Unsigned values above `i64::MAX` are kept exact as text.
fn unsigned_value(value: Option<u64>) -> Value {
    match value.map(i64::try_from) {
        Some(Ok(i)) => Value::Int(i),
        Some(Err(_)) => Value::from(value.map(|v| v.to_string())),
        None => Value::Null,
    }
}

fn decode<'r, T>(row: &'r MySqlRow, index: usize) -> Result<Option<T>>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(|e| decode_error(row, index, e))
}

fn decode_unchecked<'r, T>(row: &'r MySqlRow, index: usize) -> Result<Option<T>>
where
    T: sqlx::Decode<'r, MySql>,
{
    row.try_get_unchecked::<Option<T>, _>(index)
        .map_err(|e| decode_error(row, index, e))
}

fn decode_error(row: &MySqlRow, index: usize, error: sqlx::Error) -> ReportError {
    ReportError::query(format!(
        "Failed to read column '{}': {error}",
        row.column(index).name()
    ))
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();

    // Authentication and database-not-found errors are not transient
    if error_str.contains("access denied") || error_str.contains("unknown database") {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
        || error_str.contains("too many connections")
}

/// Maps sqlx connection errors to operator-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ReportError {
    let host = &config.host;
    let port = config.port;

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        ReportError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        ReportError::connection(format!(
            "Authentication failed for user '{}'. Check the secret's credentials.",
            config.user
        ))
    } else if error_str.contains("unknown database") {
        ReportError::connection(format!("Database '{}' does not exist.", config.database))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ReportError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ReportError::connection(error.to_string())
    }
}

/// Formats a query error the way the mysql client prints it.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    match db_error.try_downcast_ref::<MySqlDatabaseError>() {
        Some(mysql_error) => match mysql_error.code() {
            Some(state) => format!(
                "ERROR {} ({}): {}",
                mysql_error.number(),
                state,
                mysql_error.message()
            ),
            None => format!("ERROR {}: {}", mysql_error.number(), mysql_error.message()),
        },
        None => format!("ERROR: {}", db_error.message()),
    }
}
