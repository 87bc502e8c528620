//! Disposable test mailboxes on ethereal.email
//!
//! Messages sent through these accounts are never delivered; they are captured
//! and viewable through a preview link.

use super::transport::{TransportAuth, TransportSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_SMTP_HOST: &str = "smtp.ethereal.email";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_WEB_URL: &str = "https://ethereal.email";

lazy_static::lazy_static! {
    /// Trailing `[KEY=VALUE KEY=VALUE]` block of an Ethereal SMTP response
    static ref RESPONSE_TAGS_REGEX: regex::Regex = regex::Regex::new(r"\[([^\]]+)\]\s*$").unwrap();
}

#[derive(Error, Debug)]
pub enum TestAccountError {
    #[error("Test account request failed: {0}")]
    Request(String),

    #[error("Test account request rejected: {0}")]
    Rejected(String),
}

/// A provisioned test mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAccount {
    pub user: String,
    pub pass: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub web: String,
}

impl TestAccount {
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            secure: self.smtp_secure,
            ignore_tls: false,
            auth: TransportAuth::Login {
                user: self.user.clone(),
                pass: self.pass.clone(),
            },
        }
    }

    /// Link to the captured copy of a message, when the response identifies one
    pub fn preview_url(&self, smtp_response: &str) -> Option<String> {
        preview_url(&self.web, smtp_response)
    }
}

/// Provisions disposable mailboxes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestAccountProvider: Send + Sync {
    async fn create_account(&self) -> Result<TestAccount, TestAccountError>;
}

#[derive(Serialize)]
struct CreateAccountRequest<'a> {
    requestor: &'a str,
    version: &'a str,
}

#[derive(Deserialize)]
struct CreateAccountResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    pass: Option<String>,
    #[serde(default)]
    smtp: Option<SmtpEndpoint>,
    #[serde(default)]
    web: Option<String>,
}

#[derive(Deserialize)]
struct SmtpEndpoint {
    host: String,
    port: u16,
    #[serde(default)]
    secure: bool,
}

/// Ethereal account API client
pub struct EtherealAccountProvider {
    http_client: Client,
    api_url: String,
}

impl EtherealAccountProvider {
    pub fn new(http_client: Client, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl TestAccountProvider for EtherealAccountProvider {
    async fn create_account(&self) -> Result<TestAccount, TestAccountError> {
        let url = format!("{}/user", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .json(&CreateAccountRequest {
                requestor: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            })
            .send()
            .await
            .map_err(|e| TestAccountError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TestAccountError::Request(format!("{} - {}", status, body)));
        }

        let body: CreateAccountResponse = response
            .json()
            .await
            .map_err(|e| TestAccountError::Request(format!("Invalid response: {}", e)))?;

        if body.status != "success" {
            return Err(TestAccountError::Rejected(
                body.error.unwrap_or_else(|| body.status.clone()),
            ));
        }

        let (user, pass) = match (body.user, body.pass) {
            (Some(user), Some(pass)) => (user, pass),
            _ => {
                return Err(TestAccountError::Rejected(
                    "response is missing credentials".to_string(),
                ))
            }
        };

        let (smtp_host, smtp_port, smtp_secure) = match body.smtp {
            Some(smtp) => (smtp.host, smtp.port, smtp.secure),
            None => (DEFAULT_SMTP_HOST.to_string(), DEFAULT_SMTP_PORT, false),
        };

        Ok(TestAccount {
            user,
            pass,
            smtp_host,
            smtp_port,
            smtp_secure,
            web: body.web.unwrap_or_else(|| DEFAULT_WEB_URL.to_string()),
        })
    }
}

/// `<web>/message/<MSGID>` when the response tags carry both STATUS and MSGID
pub fn preview_url(web: &str, smtp_response: &str) -> Option<String> {
    let captures = RESPONSE_TAGS_REGEX.captures(smtp_response)?;

    let tags: HashMap<&str, &str> = captures[1]
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .collect();

    if !tags.contains_key("STATUS") {
        return None;
    }
    let msg_id = tags.get("MSGID")?;

    Some(format!("{}/message/{}", web.trim_end_matches('/'), msg_id))
}
