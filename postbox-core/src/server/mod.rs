//! Server initialization and routing

use crate::api;
use crate::audit::{AuditArchiver, S3AuditStore};
use crate::config::Config;
use crate::email::{EtherealAccountProvider, OAuth2TokenClient, SmtpTransportFactory};
use crate::middleware::ObservabilityLayer;
use crate::secrets::SsmSecretStore;
use crate::service::{DispatchOptions, MailDispatcher};
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Attachments arrive inline as base64
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared router state
#[derive(Clone, FromRef)]
pub struct AppState {
    pub dispatcher: Arc<MailDispatcher>,
    pub metrics: Arc<Option<PrometheusHandle>>,
}

impl AppState {
    pub fn new(dispatcher: MailDispatcher, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            metrics: Arc::new(metrics),
        }
    }
}

/// Run the HTTP server until it fails
pub async fn run(config: Config, metrics: Option<PrometheusHandle>) -> Result<()> {
    let http_client = Client::builder()
        .timeout(HTTP_CLIENT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")?;

    let dispatcher = build_dispatcher(&config, http_client).await;
    let app = build_router(AppState::new(dispatcher, metrics));

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the AWS, Ethereal and SMTP collaborators from configuration
pub async fn build_dispatcher(config: &Config, http_client: Client) -> MailDispatcher {
    let secrets = SsmSecretStore::from_region(&config.aws.region).await;
    info!("Using parameter store in {}", config.aws.region);

    let archiver = match &config.aws.audit_bucket {
        Some(bucket) => {
            info!("Audit archive bucket: {}", bucket);
            AuditArchiver::new(Arc::new(
                S3AuditStore::from_region(&config.aws.region, bucket.clone()).await,
            ))
        }
        None => {
            warn!("AUDIT_BUCKET not set; s3 audit uploads will be skipped");
            AuditArchiver::disabled()
        }
    };

    if config.dispatch.test_emails_only {
        warn!("TEST_EMAILS_ONLY is set; every message goes to a disposable test mailbox");
    }

    let test_accounts =
        EtherealAccountProvider::new(http_client.clone(), config.dispatch.ethereal_api_url.clone());
    let transports = SmtpTransportFactory::new(OAuth2TokenClient::new(
        http_client,
        config.dispatch.oauth2_token_url.clone(),
    ));

    MailDispatcher::new(
        Arc::new(secrets),
        Arc::new(test_accounts),
        Arc::new(transports),
        archiver,
        DispatchOptions {
            test_emails_only: config.dispatch.test_emails_only,
        },
    )
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/send", post(api::send::send))
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::metrics::metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(ObservabilityLayer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
