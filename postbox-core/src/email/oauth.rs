//! OAuth2 access token minting for XOAUTH2 SMTP authentication

use super::transport::{MailTransportError, OAuth2Credentials};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges refresh tokens for access tokens
#[derive(Clone)]
pub struct OAuth2TokenClient {
    http_client: Client,
    default_token_url: String,
}

impl OAuth2TokenClient {
    pub fn new(http_client: Client, default_token_url: impl Into<String>) -> Self {
        Self {
            http_client,
            default_token_url: default_token_url.into(),
        }
    }

    /// Access token to present to the SMTP server.
    ///
    /// The stored token's expiry hint is shorter than any realistic gap between
    /// storing and sending, so a fresh token is always minted first; the stored
    /// one is only used when minting fails.
    pub async fn access_token(
        &self,
        credentials: &OAuth2Credentials,
    ) -> Result<String, MailTransportError> {
        match self.refresh(credentials).await {
            Ok(token) => Ok(token),
            Err(e) => match credentials.access_token.as_deref() {
                Some(stored) if !stored.is_empty() => {
                    warn!(
                        user = %credentials.user,
                        "OAuth2 refresh failed, using stored access token: {}",
                        e
                    );
                    Ok(stored.to_string())
                }
                _ => Err(e),
            },
        }
    }

    async fn refresh(&self, credentials: &OAuth2Credentials) -> Result<String, MailTransportError> {
        let token_url = credentials
            .access_url
            .as_deref()
            .unwrap_or(&self.default_token_url);

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailTransportError::TokenRefresh(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailTransportError::TokenRefresh(format!(
                "{} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailTransportError::TokenRefresh(format!("Invalid token response: {}", e)))?;

        debug!(
            user = %credentials.user,
            expires_in = token.expires_in.unwrap_or(credentials.expires_in),
            "Minted OAuth2 access token"
        );

        Ok(token.access_token)
    }
}
