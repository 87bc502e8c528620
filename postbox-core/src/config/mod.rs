//! Configuration management for Postbox Core

use anyhow::{Context, Result};
use std::env;

/// Default AWS region for the parameter store and the audit bucket
pub const DEFAULT_AWS_REGION: &str = "eu-west-2";

/// Default API used to provision disposable Ethereal mailboxes
pub const DEFAULT_ETHEREAL_API_URL: &str = "https://api.nodemailer.com";

/// Default OAuth2 token endpoint used when a credential record has no `accessUrl`
pub const DEFAULT_OAUTH2_TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// AWS configuration
    pub aws: AwsConfig,
    /// Dispatch behaviour
    pub dispatch: DispatchConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    /// Bucket receiving archived messages for `s3` audit mode
    pub audit_bucket: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Route every send through a disposable test mailbox
    pub test_emails_only: bool,
    pub ethereal_api_url: String,
    pub oauth2_token_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            test_emails_only: false,
            ethereal_api_url: DEFAULT_ETHEREAL_API_URL.to_string(),
            oauth2_token_url: DEFAULT_OAUTH2_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            http_host: lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: lookup("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            aws: AwsConfig {
                region: lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                audit_bucket: lookup("AUDIT_BUCKET").filter(|b| !b.trim().is_empty()),
            },
            dispatch: DispatchConfig {
                test_emails_only: lookup("TEST_EMAILS_ONLY")
                    .map(|s| parse_flag(&s))
                    .unwrap_or(false),
                ethereal_api_url: lookup("ETHEREAL_API_URL")
                    .unwrap_or_else(|| DEFAULT_ETHEREAL_API_URL.to_string()),
                oauth2_token_url: lookup("OAUTH2_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_OAUTH2_TOKEN_URL.to_string()),
            },
            telemetry: TelemetryConfig {
                log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
                metrics_enabled: lookup("METRICS_ENABLED")
                    .map(|s| parse_flag(&s))
                    .unwrap_or(true),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Only the exact string `true` enables a flag
fn parse_flag(value: &str) -> bool {
    value == "true"
}
