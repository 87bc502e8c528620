//! Mail dispatch: resolve credentials, build a transport, send, archive

use crate::audit::{archive_key, AuditArchiver};
use crate::domain::{
    format_from_address, AuditMode, CredentialRecord, DispatchResponse, OutgoingMessage,
    SendRequest,
};
use crate::email::{TestAccount, TestAccountProvider, TransportFactory, TransportSettings};
use crate::error::{AppError, Result};
use crate::secrets::SecretStore;
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use validator::Validate;

const TEST_SENDER_NAME: &str = "Test Sender";
const TEST_SENDER_ADDRESS: &str = "test@test";

/// Dispatcher behaviour fixed at construction
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Treat every request as if its secret name were `"test"`
    pub test_emails_only: bool,
}

/// Transport settings and sender identity from exactly one credential path
pub struct ResolvedSender {
    pub settings: TransportSettings,
    pub from: String,
    pub audit: AuditMode,
    /// Set only on the disposable-mailbox path
    pub test_account: Option<TestAccount>,
}

/// Response plus the audit upload it may have started
pub struct DispatchOutcome {
    pub response: DispatchResponse,
    pub audit_upload: Option<JoinHandle<()>>,
}

/// Handles one send request end to end
pub struct MailDispatcher {
    secrets: Arc<dyn SecretStore>,
    test_accounts: Arc<dyn TestAccountProvider>,
    transports: Arc<dyn TransportFactory>,
    archiver: AuditArchiver,
    options: DispatchOptions,
}

impl MailDispatcher {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        test_accounts: Arc<dyn TestAccountProvider>,
        transports: Arc<dyn TransportFactory>,
        archiver: AuditArchiver,
        options: DispatchOptions,
    ) -> Self {
        Self {
            secrets,
            test_accounts,
            transports,
            archiver,
            options,
        }
    }

    /// Dispatch and return the response, leaving any audit upload detached
    pub async fn handle(&self, request: SendRequest) -> DispatchResponse {
        self.dispatch(request).await.response
    }

    /// Dispatch a request. Never fails: errors become a 400 response.
    #[instrument(skip_all, fields(secret_name = %request.secret_name))]
    pub async fn dispatch(&self, request: SendRequest) -> DispatchOutcome {
        match self.try_dispatch(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(kind = e.kind(), "Error = {}", e);
                counter!("postbox_emails_failed_total", "reason" => e.kind()).increment(1);
                DispatchOutcome {
                    response: e.into(),
                    audit_upload: None,
                }
            }
        }
    }

    async fn try_dispatch(&self, request: &SendRequest) -> Result<DispatchOutcome> {
        request.validate()?;
        let attachments = request.normalized_attachments()?;

        let sender = self.resolve_sender(request).await?;
        let transport = self.transports.build(&sender.settings).await?;

        let message = OutgoingMessage::new(
            sender.from.as_str(),
            request.to_address.as_str(),
            request.title.as_str(),
            request.text.as_str(),
        )
        .with_attachments(attachments)
        .with_reply_to(request.reply_to.clone())
        .with_audit(sender.audit);

        let receipt = transport.send(&message).await?;
        info!("Message ID: {}", receipt.message_id);

        let audit_upload = match sender.audit {
            AuditMode::S3 => self.archiver.archive(
                archive_key(
                    &request.secret_name,
                    &receipt.message_id,
                    &request.to_address,
                    &request.title,
                ),
                &message,
            ),
            AuditMode::None | AuditMode::Bcc => None,
        };

        let preview_url = sender
            .test_account
            .as_ref()
            .and_then(|account| account.preview_url(&receipt.response));
        if let Some(url) = &preview_url {
            info!("Preview URL: {}", url);
        }

        let mode = if sender.test_account.is_some() { "test" } else { "live" };
        counter!("postbox_emails_sent_total", "mode" => mode).increment(1);

        Ok(DispatchOutcome {
            response: DispatchResponse::sent(receipt.message_id, preview_url),
            audit_upload,
        })
    }

    /// Pick the credential path for the request's secret name.
    ///
    /// The test path never touches the secret store.
    pub async fn resolve_sender(&self, request: &SendRequest) -> Result<ResolvedSender> {
        if request.is_test() || self.options.test_emails_only {
            let account = self.test_accounts.create_account().await?;
            debug!(user = %account.user, "Using disposable test mailbox");

            return Ok(ResolvedSender {
                settings: account.transport_settings(),
                from: format_from_address(TEST_SENDER_NAME, TEST_SENDER_ADDRESS),
                audit: AuditMode::None,
                test_account: Some(account),
            });
        }

        let secret_name = request.secret_name.as_str();
        let raw = self.secrets.get_secret(secret_name).await?;
        let record =
            CredentialRecord::parse(&raw).map_err(|source| AppError::InvalidCredentials {
                name: secret_name.to_string(),
                source,
            })?;
        debug!(?record, "Resolved sender credentials");

        Ok(ResolvedSender {
            settings: TransportSettings::from_record(&record),
            from: record.from_address(),
            audit: record.audit,
            test_account: None,
        })
    }
}
