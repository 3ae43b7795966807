//! AWS Secrets Manager secret source.

use super::{SecretPayload, SecretSource};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tracing::debug;

/// Secret source backed by AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct AwsSecretsManager {
    client: Client,
}

impl AwsSecretsManager {
    /// Creates a client authenticated with the named shared-config profile.
    ///
    /// The region comes from the profile unless `region` overrides it.
    pub async fn connect(profile: &str, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        debug!(
            "Secrets Manager client for profile '{}' in region {:?}",
            profile,
            sdk_config.region()
        );

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl SecretSource for AwsSecretsManager {
    async fn fetch_secret(&self, secret_id: &str) -> Result<SecretPayload> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                ReportError::secret(format!(
                    "Failed to read secret '{secret_id}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        if let Some(text) = output.secret_string() {
            return Ok(SecretPayload::Text(text.to_string()));
        }

        match output.secret_binary() {
            Some(blob) => Ok(SecretPayload::Binary(blob.as_ref().to_vec())),
            None => Err(ReportError::secret(format!(
                "Secret '{secret_id}' has neither a string nor a binary value"
            ))),
        }
    }
}
