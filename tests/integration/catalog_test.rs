//! Startup integration tests: catalog loading and credential resolution.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use db_reports::catalog::QueryCatalog;
use db_reports::config::ConnectionConfig;
use db_reports::secrets::{resolve_credentials, SecretPayload, StaticSecretSource};

const SECRET: &str = r#"{"username":"report_ro","password":"s3cr3t!","host":"mysql.internal","dbname":"shop","port":"3306"}"#;

#[test]
fn test_catalog_file_order_drives_menu_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.json");
    std::fs::write(
        &path,
        r#"[
            {"description": "zeta", "query": "SELECT ? , ?"},
            {"description": "alpha", "query": "SELECT ? , ?"},
            {"description": "mid", "query": "SELECT ? , ?"}
        ]"#,
    )
    .unwrap();

    let catalog = QueryCatalog::load_from_file(&path).unwrap();

    assert_eq!(catalog.select(1).unwrap().description, "zeta");
    assert_eq!(catalog.select(2).unwrap().description, "alpha");
    assert_eq!(catalog.select(3).unwrap().description, "mid");
}

#[test]
fn test_malformed_catalog_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.json");
    std::fs::write(&path, r#"{"description": "not an array"}"#).unwrap();

    let err = QueryCatalog::load_from_file(&path).unwrap_err();

    assert_eq!(err.category(), "Catalog Error");
    assert!(!err.is_recoverable());
    assert!(err.to_string().contains("queries.json"));
}

#[tokio::test]
async fn test_text_and_binary_secrets_resolve_identically() {
    let source = StaticSecretSource::new()
        .with_secret("text", SecretPayload::Text(SECRET.to_string()))
        .with_secret(
            "binary",
            SecretPayload::Binary(STANDARD.encode(SECRET).into_bytes()),
        );

    let text = resolve_credentials(&source, "text").await.unwrap();
    let binary = resolve_credentials(&source, "binary").await.unwrap();

    assert_eq!(text, binary);

    let connection = ConnectionConfig::from_credentials(&text);
    assert_eq!(connection.display_string(), "shop @ mysql.internal:3306 as report_ro");
}

#[tokio::test]
async fn test_unknown_secret_is_fatal() {
    let source = StaticSecretSource::new();

    let err = resolve_credentials(&source, "prod/missing").await.unwrap_err();

    assert_eq!(err.category(), "Secret Error");
    assert!(!err.is_recoverable());
}
