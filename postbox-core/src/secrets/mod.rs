//! Sender credential lookup
//!
//! Credentials live as JSON parameters in AWS Systems Manager Parameter Store
//! and are fetched (decrypted) on every dispatch.

use async_trait::async_trait;
use aws_sdk_ssm::{config::Region, error::DisplayErrorContext, Client};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Secret '{0}' not found")]
    NotFound(String),

    #[error("Secret '{0}' has no value")]
    Empty(String),

    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store holding credential records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Raw (decrypted) value stored under `name`
    async fn get_secret(&self, name: &str) -> Result<String, SecretStoreError>;
}

/// AWS SSM Parameter Store backed secret store
pub struct SsmSecretStore {
    client: Client,
}

impl SsmSecretStore {
    /// Create a store using the default credential chain (IAM role, env vars, etc.)
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::from_env()
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self::new(Client::new(&sdk_config))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SsmSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_parameter_not_found())
                    .unwrap_or(false)
                {
                    SecretStoreError::NotFound(name.to_string())
                } else {
                    SecretStoreError::Unavailable(DisplayErrorContext(&e).to_string())
                }
            })?;

        output
            .parameter
            .and_then(|p| p.value)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretStoreError::Empty(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_secret_store() {
        let mut mock = MockSecretStore::new();

        mock.expect_get_secret()
            .withf(|name| name == "mail/acme")
            .returning(|_| Ok(r#"{"type": "login"}"#.to_string()));
        mock.expect_get_secret()
            .withf(|name| name != "mail/acme")
            .returning(|name| Err(SecretStoreError::NotFound(name.to_string())));

        assert!(mock.get_secret("mail/acme").await.is_ok());
        assert!(matches!(
            mock.get_secret("mail/other").await,
            Err(SecretStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_secret_store_error_display() {
        assert_eq!(
            SecretStoreError::NotFound("mail/acme".to_string()).to_string(),
            "Secret 'mail/acme' not found"
        );
        assert_eq!(
            SecretStoreError::Empty("mail/acme".to_string()).to_string(),
            "Secret 'mail/acme' has no value"
        );
        assert!(SecretStoreError::Unavailable("dispatch failure".to_string())
            .to_string()
            .contains("dispatch failure"));
    }

    #[tokio::test]
    async fn test_ssm_store_from_region() {
        // Loading config never calls AWS, so this works without credentials
        let store = SsmSecretStore::from_region("eu-west-2").await;
        assert_eq!(
            store.client.config().region().map(|r| r.as_ref()),
            Some("eu-west-2")
        );
    }
}
