//! Archival of sent messages for the `s3` audit mode
//!
//! Uploads run on their own tokio task and never block or fail a dispatch;
//! errors are logged and counted.

use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use aws_sdk_s3::{config::Region, error::DisplayErrorContext, primitives::ByteStream, Client};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum AuditStoreError {
    #[error("Audit upload failed: {0}")]
    UploadFailed(String),
}

/// Object store receiving audit records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Store `body` under `key`, returning the object's location
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, AuditStoreError>;
}

/// S3 bucket backed audit store
pub struct S3AuditStore {
    client: Client,
    bucket: String,
}

impl S3AuditStore {
    pub async fn from_region(region: &str, bucket: impl Into<String>) -> Self {
        let sdk_config = aws_config::from_env()
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self::new(Client::new(&sdk_config), bucket)
    }

    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl AuditStore for S3AuditStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, AuditStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AuditStoreError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(format!("s3://{}/{}", self.bucket, key))
    }
}

/// `<secretName>/<messageId>-<toAddress>-<title>.json`
pub fn archive_key(secret_name: &str, message_id: &str, to_address: &str, title: &str) -> String {
    format!("{}/{}-{}-{}.json", secret_name, message_id, to_address, title)
}

/// Spawns audit uploads
#[derive(Clone, Default)]
pub struct AuditArchiver {
    store: Option<Arc<dyn AuditStore>>,
}

impl AuditArchiver {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store: Some(store) }
    }

    /// No bucket configured; archive requests are skipped
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Start uploading `message` under `key`.
    ///
    /// The returned handle may be dropped; the upload keeps running detached.
    pub fn archive(&self, key: String, message: &OutgoingMessage) -> Option<JoinHandle<()>> {
        let Some(store) = self.store.clone() else {
            warn!(%key, "Audit mode is s3 but no audit bucket is configured, skipping upload");
            counter!("postbox_audit_uploads_total", "result" => "skipped").increment(1);
            return None;
        };

        let body = match message.to_audit_json() {
            Ok(body) => body,
            Err(e) => {
                error!(%key, "Failed to serialize audit record: {}", e);
                counter!("postbox_audit_uploads_total", "result" => "failed").increment(1);
                return None;
            }
        };

        Some(tokio::spawn(async move {
            match store.put_object(&key, body).await {
                Ok(location) => {
                    info!("Audit file uploaded successfully: {}", location);
                    counter!("postbox_audit_uploads_total", "result" => "uploaded").increment(1);
                }
                Err(e) => {
                    error!(%key, "{}", e);
                    counter!("postbox_audit_uploads_total", "result" => "failed").increment(1);
                }
            }
        }))
    }
}
