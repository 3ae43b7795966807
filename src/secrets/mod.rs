//! Credential resolution from a secret store.
//!
//! A secret holds a JSON object with the database credentials. The store may
//! hand it back as text or as a binary payload carrying base64 text.

mod aws;

pub use aws::AwsSecretsManager;

use crate::config::DEFAULT_PORT;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// Raw secret value as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// The secret was stored as a string.
    Text(String),
    /// The secret was stored as bytes; they hold base64 text.
    Binary(Vec<u8>),
}

/// Database credentials decoded from a secret.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialBundle {
    pub username: String,
    pub password: String,
    pub host: String,
    pub dbname: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Accepts the port as a JSON number or as a numeric string.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    let port = match Port::deserialize(deserializer)? {
        Port::Number(n) => n,
        Port::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{s}'")))?,
    };

    u16::try_from(port)
        .map_err(|_| serde::de::Error::custom(format!("port {port} is out of range")))
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("port", &self.port)
            .finish()
    }
}

/// A store that can look up secrets by identifier.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetches the raw payload of the named secret.
    async fn fetch_secret(&self, secret_id: &str) -> Result<SecretPayload>;
}

/// Fetches the named secret and decodes it into credentials.
pub async fn resolve_credentials(
    source: &dyn SecretSource,
    secret_id: &str,
) -> Result<CredentialBundle> {
    let payload = source.fetch_secret(secret_id).await?;
    decode_credentials(&payload).map_err(|e| match e {
        ReportError::Secret(msg) => ReportError::secret(format!("Secret '{secret_id}': {msg}")),
        other => other,
    })
}

/// Decodes a secret payload into credentials.
///
/// Text payloads are parsed as JSON directly; binary payloads are base64
/// decoded first.
pub fn decode_credentials(payload: &SecretPayload) -> Result<CredentialBundle> {
    let json = match payload {
        SecretPayload::Text(text) => text.as_bytes().to_vec(),
        SecretPayload::Binary(bytes) => STANDARD
            .decode(bytes.trim_ascii())
            .map_err(|e| ReportError::secret(format!("binary secret is not valid base64: {e}")))?,
    };

    serde_json::from_slice(&json)
        .map_err(|e| ReportError::secret(format!("secret is not a credential object: {e}")))
}

/// In-memory secret store, keyed by secret identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretSource {
    secrets: HashMap<String, SecretPayload>,
}

impl StaticSecretSource {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret to the store.
    pub fn with_secret(mut self, secret_id: impl Into<String>, payload: SecretPayload) -> Self {
        self.secrets.insert(secret_id.into(), payload);
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch_secret(&self, secret_id: &str) -> Result<SecretPayload> {
        self.secrets.get(secret_id).cloned().ok_or_else(|| {
            ReportError::secret(format!("Secrets Manager can't find the secret '{secret_id}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_JSON: &str = r#"{
        "username": "report_ro",
        "password": "hunter2",
        "host": "db.internal",
        "dbname": "sales",
        "port": 3306,
        "engine": "mysql"
    }"#;

    #[test]
    fn test_decode_text_payload() {
        let creds = decode_credentials(&SecretPayload::Text(SECRET_JSON.to_string())).unwrap();

        assert_eq!(creds.username, "report_ro");
        assert_eq!(creds.password, "hunter2");
        assert_eq!(creds.host, "db.internal");
        assert_eq!(creds.dbname, "sales");
        assert_eq!(creds.port, 3306);
    }

    #[test]
    fn test_decode_binary_payload() {
        let encoded = STANDARD.encode(SECRET_JSON);
        let mut bytes = encoded.into_bytes();
        bytes.push(b'\n');

        let creds = decode_credentials(&SecretPayload::Binary(bytes)).unwrap();
        assert_eq!(creds.dbname, "sales");
        assert_eq!(creds.port, 3306);
    }

    #[test]
    fn test_decode_port_as_string() {
        let json = r#"{"username":"u","password":"p","host":"h","dbname":"d","port":"3310"}"#;
        let creds = decode_credentials(&SecretPayload::Text(json.to_string())).unwrap();
        assert_eq!(creds.port, 3310);
    }

    #[test]
    fn test_decode_missing_port_uses_default() {
        let json = r#"{"username":"u","password":"p","host":"h","dbname":"d"}"#;
        let creds = decode_credentials(&SecretPayload::Text(json.to_string())).unwrap();
        assert_eq!(creds.port, DEFAULT_PORT);
    }

    #[test]
    fn test_decode_port_out_of_range() {
        let json = r#"{"username":"u","password":"p","host":"h","dbname":"d","port":70000}"#;
        let err = decode_credentials(&SecretPayload::Text(json.to_string())).unwrap_err();
        assert_eq!(err.category(), "Secret Error");
    }

    #[test]
    fn test_decode_missing_key() {
        let json = r#"{"username":"u","password":"p","host":"h"}"#;
        let err = decode_credentials(&SecretPayload::Text(json.to_string())).unwrap_err();
        assert!(err.to_string().contains("dbname"));
    }

    #[test]
    fn test_decode_binary_not_base64() {
        let err = decode_credentials(&SecretPayload::Binary(b"{not base64}".to_vec())).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = decode_credentials(&SecretPayload::Text(SECRET_JSON.to_string())).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("report_ro"));
    }

    #[tokio::test]
    async fn test_resolve_from_static_source() {
        let source = StaticSecretSource::new()
            .with_secret("prod/reporting", SecretPayload::Text(SECRET_JSON.to_string()));

        let creds = resolve_credentials(&source, "prod/reporting").await.unwrap();
        assert_eq!(creds.host, "db.internal");
    }

    #[tokio::test]
    async fn test_resolve_unknown_secret_is_fatal() {
        let source = StaticSecretSource::new();

        let err = resolve_credentials(&source, "missing").await.unwrap_err();
        assert_eq!(err.category(), "Secret Error");
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_resolve_undecodable_secret_names_secret() {
        let source = StaticSecretSource::new()
            .with_secret("prod/reporting", SecretPayload::Text("not json".to_string()));

        let err = resolve_credentials(&source, "prod/reporting").await.unwrap_err();
        assert!(err.to_string().contains("prod/reporting"));
    }
}
