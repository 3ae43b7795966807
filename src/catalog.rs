//! Query catalog for db-reports.
//!
//! Loads the named, parameterized report queries from a JSON file. Each query
//! takes a start date and an end date, in that order.

use crate::error::{ReportError, Result};
use serde::Deserialize;
use std::path::Path;

/// Default catalog file, relative to the working directory.
pub const DEFAULT_CATALOG_FILE: &str = "queries.json";

/// Number of positional parameters every catalog query takes.
pub const QUERY_PARAMETERS: usize = 2;

/// A named report query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryDefinition {
    /// Menu label, also used to name report files.
    pub description: String,

    /// SQL text with two positional `?` markers.
    pub query: String,
}

/// Ordered, read-only set of report queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    queries: Vec<QueryDefinition>,
}

impl QueryCatalog {
    /// Loads the catalog from a JSON file.
    ///
    /// A missing or malformed file is an error; there is no partial catalog.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::catalog(format!(
                "Failed to read query catalog {}: {e}",
                path.display()
            ))
        })?;

        Self::parse_json(&content).map_err(|e| match e {
            ReportError::Catalog(msg) => {
                ReportError::catalog(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parses and validates a catalog from a JSON string.
    pub fn parse_json(content: &str) -> Result<Self> {
        let raw: Vec<QueryDefinition> = serde_json::from_str(content)
            .map_err(|e| ReportError::catalog(format!("invalid catalog JSON: {e}")))?;

        Self::from_definitions(raw)
    }

    /// Builds a catalog from definitions, normalizing their parameter markers.
    pub fn from_definitions(definitions: Vec<QueryDefinition>) -> Result<Self> {
        if definitions.is_empty() {
            return Err(ReportError::catalog("catalog contains no queries"));
        }

        let queries = definitions
            .into_iter()
            .enumerate()
            .map(|(i, def)| {
                let position = i + 1;
                if def.description.trim().is_empty() {
                    return Err(ReportError::catalog(format!(
                        "query #{position} has an empty description"
                    )));
                }

                let (query, markers) = normalize_placeholders(&def.query);
                if markers != QUERY_PARAMETERS {
                    return Err(ReportError::catalog(format!(
                        "query #{position} ('{}') has {markers} parameter markers, expected {QUERY_PARAMETERS}",
                        def.description
                    )));
                }

                Ok(QueryDefinition {
                    description: def.description,
                    query,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { queries })
    }

    /// Returns the queries in menu order.
    pub fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    /// Returns the number of queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns true if the catalog has no queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Looks up a query by its 1-based menu number.
    pub fn select(&self, number: usize) -> Option<&QueryDefinition> {
        number
            .checked_sub(1)
            .and_then(|index| self.queries.get(index))
    }
}

/// Rewrites `%s` markers to `?` and counts the `?` markers.
///
/// Quoted strings, quoted identifiers and comments are copied untouched.
pub fn normalize_placeholders(sql: &str) -> (String, usize) {
    let mut out = String::with_capacity(sql.len());
    let mut markers = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                copy_quoted(c, &mut chars, &mut out);
            }
            '#' => {
                out.push(c);
                copy_until_newline(&mut chars, &mut out);
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                if let Some(dash) = chars.next() {
                    out.push(dash);
                }
                if chars.peek().map_or(true, |next| next.is_whitespace()) {
                    copy_until_newline(&mut chars, &mut out);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(c);
                if let Some(star) = chars.next() {
                    out.push(star);
                }
                copy_block_comment(&mut chars, &mut out);
            }
            '%' if chars.peek() == Some(&'s') => {
                chars.next();
                out.push('?');
                markers += 1;
            }
            '?' => {
                out.push(c);
                markers += 1;
            }
            _ => out.push(c),
        }
    }

    (out, markers)
}

fn copy_quoted(quote: char, chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' && quote != '`' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            // A doubled quote is an escaped quote, not the end of the literal.
            if chars.peek() == Some(&quote) {
                if let Some(q) = chars.next() {
                    out.push(q);
                }
            } else {
                return;
            }
        }
    }
}

fn copy_until_newline(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        out.push(c);
        if c == '\n' {
            return;
        }
    }
}

fn copy_block_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '*' && chars.peek() == Some(&'/') {
            if let Some(slash) = chars.next() {
                out.push(slash);
            }
            return;
        }
    }
}
