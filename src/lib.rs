//! db-reports - interactive parameterized MySQL reports exported to CSV.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod report;
pub mod secrets;
pub mod session;
