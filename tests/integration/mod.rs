//! Integration tests for db-reports.

pub mod catalog_test;
pub mod mysql_test;
pub mod session_test;
