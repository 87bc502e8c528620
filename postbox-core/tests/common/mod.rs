//! Common test utilities
//!
//! In-memory stand-ins for the parameter store, audit bucket, test account API
//! and SMTP transport, plus helpers that drive the production router.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use postbox_core::audit::{AuditArchiver, AuditStore, AuditStoreError};
use postbox_core::domain::OutgoingMessage;
use postbox_core::email::{
    MailTransport, MailTransportError, SendReceipt, TestAccount, TestAccountError,
    TestAccountProvider, TransportFactory, TransportSettings,
};
use postbox_core::secrets::{SecretStore, SecretStoreError};
use postbox_core::server::{build_router, AppState};
use postbox_core::service::{DispatchOptions, MailDispatcher};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tower::ServiceExt;

// ============================================================================
// Secret store
// ============================================================================

#[derive(Default)]
pub struct TestSecretStore {
    secrets: RwLock<HashMap<String, String>>,
    lookups: Mutex<Vec<String>>,
}

impl TestSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, name: &str, value: &str) {
        self.secrets
            .write()
            .await
            .insert(name.to_string(), value.to_string());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for TestSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        self.lookups.lock().unwrap().push(name.to_string());
        self.secrets
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound(name.to_string()))
    }
}

// ============================================================================
// Audit store
// ============================================================================

#[derive(Default)]
pub struct TestAuditStore {
    objects: RwLock<Vec<(String, Vec<u8>)>>,
}

impl TestAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn objects(&self) -> Vec<(String, Vec<u8>)> {
        self.objects.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for TestAuditStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, AuditStoreError> {
        self.objects.write().await.push((key.to_string(), body));
        Ok(format!("s3://test-audit/{}", key))
    }
}

// ============================================================================
// Test accounts
// ============================================================================

pub struct TestAccounts {
    account: TestAccount,
    created: Mutex<usize>,
}

impl TestAccounts {
    pub fn new() -> Self {
        Self {
            account: TestAccount {
                user: "mina@ethereal.email".to_string(),
                pass: "ethereal-pass".to_string(),
                smtp_host: "smtp.ethereal.email".to_string(),
                smtp_port: 587,
                smtp_secure: false,
                web: "https://ethereal.email".to_string(),
            },
            created: Mutex::new(0),
        }
    }

    pub fn created(&self) -> usize {
        *self.created.lock().unwrap()
    }
}

#[async_trait]
impl TestAccountProvider for TestAccounts {
    async fn create_account(&self) -> Result<TestAccount, TestAccountError> {
        *self.created.lock().unwrap() += 1;
        Ok(self.account.clone())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Records every transport it builds and every message sent through them
pub struct RecordingTransports {
    response: String,
    failure: Option<String>,
    settings: Arc<Mutex<Vec<TransportSettings>>>,
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
}

impl RecordingTransports {
    /// Accept every message with the given SMTP response line
    pub fn accepting(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failure: None,
            settings: Arc::default(),
            sent: Arc::default(),
        }
    }

    /// Reject every message with a send failure
    pub fn failing(error: &str) -> Self {
        Self {
            failure: Some(error.to_string()),
            ..Self::accepting("")
        }
    }

    pub fn settings(&self) -> Vec<TransportSettings> {
        self.settings.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

struct RecordingTransport {
    response: String,
    failure: Option<String>,
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, MailTransportError> {
        if let Some(error) = &self.failure {
            return Err(MailTransportError::SendFailed(error.clone()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(SendReceipt {
            message_id: format!("<msg-{}@test.local>", sent.len()),
            response: self.response.clone(),
        })
    }
}

#[async_trait]
impl TransportFactory for RecordingTransports {
    async fn build(
        &self,
        settings: &TransportSettings,
    ) -> Result<Box<dyn MailTransport>, MailTransportError> {
        self.settings.lock().unwrap().push(settings.clone());
        Ok(Box::new(RecordingTransport {
            response: self.response.clone(),
            failure: self.failure.clone(),
            sent: self.sent.clone(),
        }))
    }
}

// ============================================================================
// Test app
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub secrets: Arc<TestSecretStore>,
    pub audit: Arc<TestAuditStore>,
    pub accounts: Arc<TestAccounts>,
    pub transports: Arc<RecordingTransports>,
}

impl TestApp {
    pub fn new(transports: RecordingTransports) -> Self {
        Self::with_options(transports, DispatchOptions::default())
    }

    pub fn with_options(transports: RecordingTransports, options: DispatchOptions) -> Self {
        let secrets = Arc::new(TestSecretStore::new());
        let audit = Arc::new(TestAuditStore::new());
        let accounts = Arc::new(TestAccounts::new());
        let transports = Arc::new(transports);

        let dispatcher = MailDispatcher::new(
            secrets.clone(),
            accounts.clone(),
            transports.clone(),
            AuditArchiver::new(audit.clone()),
            options,
        );

        Self {
            router: build_router(AppState::new(dispatcher, None)),
            secrets,
            audit,
            accounts,
            transports,
        }
    }
}

pub const LOGIN_SECRET: &str = r#"{
    "type": "login",
    "host": "smtp.acme.test",
    "port": 587,
    "secure": false,
    "username": "billing@acme.test",
    "password": "s3cret",
    "displayName": "Acme Billing",
    "audit": "s3"
}"#;

// ============================================================================
// Request helpers
// ============================================================================

/// Make a GET request and return the raw body
pub async fn get_text(app: &Router, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    (status, String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Make a POST request with a raw body and parse the JSON response
pub async fn post_raw<R: DeserializeOwned>(
    app: &Router,
    path: &str,
    body: impl Into<Body>,
) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    if body_bytes.is_empty() {
        return (status, None);
    }

    match serde_json::from_slice(&body_bytes) {
        Ok(data) => (status, Some(data)),
        Err(_) => (status, None),
    }
}

/// Make a POST request with JSON body and parse JSON response
pub async fn post_json<T: Serialize, R: DeserializeOwned>(
    app: &Router,
    path: &str,
    body: &T,
) -> (StatusCode, Option<R>) {
    post_raw(app, path, serde_json::to_string(body).unwrap()).await
}

/// Wait for detached audit uploads to land
pub async fn wait_for_objects(store: &TestAuditStore, count: usize) -> Vec<(String, Vec<u8>)> {
    for _ in 0..100 {
        let objects = store.objects().await;
        if objects.len() >= count {
            return objects;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    store.objects().await
}
