//! Mail transport traits, settings and error types

use crate::domain::{CredentialAuth, CredentialRecord, OutgoingMessage, OAUTH2_EXPIRES_HINT_SECS};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Mail transport error types
#[derive(Error, Debug)]
pub enum MailTransportError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("OAuth2 token refresh failed: {0}")]
    TokenRefresh(String),
}

/// What the server said after accepting a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// `Message-ID` header value, angle brackets included
    pub message_id: String,
    /// Final SMTP response line, e.g. `250 Accepted [STATUS=new MSGID=...]`
    pub response: String,
}

/// A connected-on-demand mail transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, MailTransportError>;
}

/// Builds a [`MailTransport`] for one dispatch.
///
/// Kept behind a trait so dispatch tests never open sockets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn build(
        &self,
        settings: &TransportSettings,
    ) -> Result<Box<dyn MailTransport>, MailTransportError>;
}

/// Connection and authentication parameters for an SMTP transport
#[derive(Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS
    pub secure: bool,
    /// Skip STARTTLS even when the server offers it
    pub ignore_tls: bool,
    pub auth: TransportAuth,
}

#[derive(Clone, PartialEq, Eq)]
pub enum TransportAuth {
    Login { user: String, pass: String },
    OAuth2(OAuth2Credentials),
}

#[derive(Clone, PartialEq, Eq)]
pub struct OAuth2Credentials {
    pub user: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub access_token: Option<String>,
    pub access_url: Option<String>,
    /// Lifetime hint for `access_token`, in seconds
    pub expires_in: u64,
}

impl TransportSettings {
    pub fn from_record(record: &CredentialRecord) -> Self {
        match &record.auth {
            CredentialAuth::Login { password } => Self {
                host: record.host.clone(),
                port: record.port,
                secure: record.secure,
                ignore_tls: record.ignore_tls,
                auth: TransportAuth::Login {
                    user: record.username.clone(),
                    pass: password.clone(),
                },
            },
            // ignoreTLS only applies to login records
            CredentialAuth::OAuth2 {
                client_id,
                client_secret,
                refresh_token,
                access_token,
                access_url,
            } => Self {
                host: record.host.clone(),
                port: record.port,
                secure: record.secure,
                ignore_tls: false,
                auth: TransportAuth::OAuth2(OAuth2Credentials {
                    user: record.username.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                    access_token: access_token.clone(),
                    access_url: access_url.clone(),
                    expires_in: OAUTH2_EXPIRES_HINT_SECS,
                }),
            },
        }
    }

    pub fn user(&self) -> &str {
        match &self.auth {
            TransportAuth::Login { user, .. } => user,
            TransportAuth::OAuth2(creds) => &creds.user,
        }
    }
}

impl fmt::Debug for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = match &self.auth {
            TransportAuth::Login { .. } => "login",
            TransportAuth::OAuth2(_) => "OAuth2",
        };
        f.debug_struct("TransportSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("ignore_tls", &self.ignore_tls)
            .field("user", &self.user())
            .field("auth", &auth)
            .finish()
    }
}
