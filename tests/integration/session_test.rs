//! Interactive session integration tests.
//!
//! Drives whole operator sessions through a scripted console and checks the
//! reports written to disk.

use db_reports::catalog::QueryCatalog;
use db_reports::config::ExportSettings;
use db_reports::db::{ColumnInfo, FailingDatabaseClient, MockDatabaseClient, Row, Value};
use db_reports::session::{ReportSession, ScriptedConsole, SessionState};
use pretty_assertions::assert_eq;
use std::path::Path;

const SALES_SQL: &str = "SELECT day, region, total FROM sales WHERE day >= ? AND day < ?";
const REFUNDS_SQL: &str = "SELECT id FROM refunds WHERE created_at BETWEEN ? AND ?";

const CATALOG: &str = r#"[
    {"description": "daily_sales", "query": "SELECT day, region, total FROM sales WHERE day >= %s AND day < %s"},
    {"description": "refunds", "query": "SELECT id FROM refunds WHERE created_at BETWEEN ? AND ?"}
]"#;

fn sales_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            vec![
                Value::from(format!("2024-01-{:02}", i % 28 + 1)),
                Value::from(if i % 2 == 0 { "EU" } else { "US, East" }),
                Value::Float(i as f64 + 0.25),
            ]
        })
        .collect()
}

fn sales_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("day", "DATE"),
        ColumnInfo::new("region", "VARCHAR"),
        ColumnInfo::new("total", "DOUBLE"),
    ]
}

fn new_session(db: MockDatabaseClient, reports_dir: &Path) -> ReportSession {
    ReportSession::new(
        Box::new(db),
        QueryCatalog::parse_json(CATALOG).unwrap(),
        ExportSettings::with_reports_dir(reports_dir),
    )
}

#[tokio::test]
async fn test_report_across_batches_matches_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    let db = MockDatabaseClient::new().with_result(SALES_SQL, sales_columns(), sales_rows(3456));
    let handle = db.clone();
    let mut session = new_session(db, &reports);
    let mut console = ScriptedConsole::new(["1", "2024-01-01", "2024-01-31", "n"]);

    session.run(&mut console).await.unwrap();

    let path = reports.join("daily_sales_2024-01-01_2024-01-31.csv");
    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["day", "region", "total"]);

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3456);
    assert_eq!(&records[1][1], "US, East");
    assert_eq!(&records[3455][2], "3455.25");

    assert_eq!(handle.fetch_sizes(), vec![1000, 1000, 1000, 1000, 1000]);
    assert_eq!(
        handle.executed()[0].params,
        vec!["2024-01-01".to_string(), "2024-01-31".to_string()]
    );
    assert!(console.shows("Fetched 3456 rows from the database."));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_reports_directory_is_created_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("nested").join("reports");
    let db = MockDatabaseClient::new().with_result(SALES_SQL, sales_columns(), sales_rows(1));
    let mut session = new_session(db, &reports);
    let mut console = ScriptedConsole::new(["1", "2024-03-01", "2024-03-02", "n"]);

    session.run(&mut console).await.unwrap();

    assert!(reports
        .join("daily_sales_2024-03-01_2024-03-02.csv")
        .is_file());
}

#[tokio::test]
async fn test_invalid_selections_then_exit() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabaseClient::new();
    let handle = db.clone();
    let mut session = new_session(db, dir.path());
    let mut console = ScriptedConsole::new(["0", "3", "abc", "-2"]);

    for _ in 0..4 {
        session.step(&mut console).await.unwrap();
        assert_eq!(session.state(), &SessionState::Select);
    }

    let rejections = console
        .transcript()
        .iter()
        .filter(|line| line.as_str() == "Invalid selection, Try again!")
        .count();
    assert_eq!(rejections, 4);
    assert!(handle.executed().is_empty());

    // Script exhausted: end of input ends the session
    session.run(&mut console).await.unwrap();
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_no_data_then_second_report() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabaseClient::new()
        .with_result(REFUNDS_SQL, vec![ColumnInfo::new("id", "BIGINT")], vec![])
        .with_result(SALES_SQL, sales_columns(), sales_rows(2));
    let mut session = new_session(db, dir.path());
    let mut console = ScriptedConsole::new([
        "2",
        "2024-01-01",
        "2024-01-31",
        "1",
        "2024-01-01",
        "2024-01-31",
        "n",
    ]);

    session.run(&mut console).await.unwrap();

    assert!(console.shows("No data returned from the query."));
    let files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["daily_sales_2024-01-01_2024-01-31.csv".to_string()]);
}

#[tokio::test]
async fn test_query_error_then_retry_then_exit() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabaseClient::new()
        .with_error(REFUNDS_SQL, "ERROR 1146 (42S02): Table 'shop.refunds' doesn't exist")
        .with_result(SALES_SQL, sales_columns(), sales_rows(10));
    let handle = db.clone();
    let mut session = new_session(db, dir.path());
    let mut console = ScriptedConsole::new([
        "2",
        "2024-01-01",
        "2024-01-31",
        "y",
        "1",
        "2024-01-01",
        "2024-01-31",
        "N",
    ]);

    session.run(&mut console).await.unwrap();

    assert!(console.shows("Error executing query:"));
    assert!(console.shows("doesn't exist"));
    assert_eq!(handle.executed().len(), 2);
    assert!(dir.path().join("daily_sales_2024-01-01_2024-01-31.csv").exists());
    assert!(handle.is_closed());
    assert_eq!(console.remaining_inputs(), 0);
}

#[tokio::test]
async fn test_error_mid_fetch_discards_rows_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabaseClient::new()
        .with_result(SALES_SQL, sales_columns(), sales_rows(2500))
        .with_fetch_error_after(
            SALES_SQL,
            1,
            "ERROR 2013 (HY000): Lost connection to MySQL server during query",
        );
    let handle = db.clone();
    let mut session = new_session(db, dir.path());
    let mut console = ScriptedConsole::new(["1", "2024-01-01", "2024-01-31", "n"]);

    for _ in 0..3 {
        session.step(&mut console).await.unwrap();
    }

    assert_eq!(session.state(), &SessionState::ContinueDecision);
    assert!(console.shows("Error executing query:"));
    assert!(console.shows("Lost connection"));
    assert!(!console.shows("Fetched"));
    assert_eq!(handle.fetch_sizes(), vec![1000, 1000]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    session.run(&mut console).await.unwrap();
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_failing_database_never_crashes_loop() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ReportSession::new(
        Box::new(FailingDatabaseClient::new("Lost connection to MySQL server during query")),
        QueryCatalog::parse_json(CATALOG).unwrap(),
        ExportSettings::with_reports_dir(dir.path()),
    );
    let mut console = ScriptedConsole::new(["1", "a", "b", "", "2", "c", "d", "n"]);

    session.run(&mut console).await.unwrap();

    let errors = console
        .transcript()
        .iter()
        .filter(|line| line.starts_with("Error executing query:"))
        .count();
    assert_eq!(errors, 2);
    assert_eq!(session.state(), &SessionState::Finished);
}

#[tokio::test]
async fn test_unwritable_reports_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("reports");
    std::fs::write(&blocker, "not a directory").unwrap();
    let db = MockDatabaseClient::new().with_result(SALES_SQL, sales_columns(), sales_rows(1));
    let mut session = new_session(db, &blocker);
    let mut console = ScriptedConsole::new(["1", "2024-01-01", "2024-01-31", "n"]);

    let err = session.run(&mut console).await.unwrap_err();

    assert_eq!(err.category(), "Export Error");
    assert!(!err.is_recoverable());
}
