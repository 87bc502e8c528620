//! SMTP mail transport implementation using lettre

use super::oauth::OAuth2TokenClient;
use super::transport::{
    MailTransport, MailTransportError, SendReceipt, TransportAuth, TransportFactory,
    TransportSettings,
};
use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use lettre::{
    message::{
        header::ContentType, Attachment as MimeAttachment, Mailbox, Mailboxes, MultiPart,
        SinglePart,
    },
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;
use uuid::Uuid;

/// SMTP-backed transport, built fresh for each dispatch
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build a transport for settings whose credentials are already final
    pub fn new(
        settings: &TransportSettings,
        credentials: Credentials,
        mechanisms: Vec<Mechanism>,
    ) -> Result<Self, MailTransportError> {
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| MailTransportError::InvalidConfiguration(e.to_string()))?
        } else if settings.ignore_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        } else {
            let tls_params = TlsParameters::new(settings.host.clone())
                .map_err(|e| MailTransportError::InvalidConfiguration(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .tls(Tls::Opportunistic(tls_params))
        };

        let transport = builder
            .port(settings.port)
            .credentials(credentials)
            .authentication(mechanisms)
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, MailTransportError> {
        let (email, message_id) = build_email(message)?;

        match self.transport.send(email).await {
            Ok(response) => {
                let lines: Vec<&str> = response.message().collect();
                Ok(SendReceipt {
                    message_id,
                    response: format!("{} {}", response.code(), lines.join(" ")),
                })
            }
            Err(e) => {
                let error_msg = e.to_string();
                let lowered = error_msg.to_lowercase();
                if lowered.contains("authentication") || error_msg.contains("AUTH") {
                    Err(MailTransportError::AuthenticationFailed(error_msg))
                } else if e.is_timeout() || lowered.contains("connection") {
                    Err(MailTransportError::ConnectionError(error_msg))
                } else {
                    Err(MailTransportError::SendFailed(error_msg))
                }
            }
        }
    }
}

/// Builds [`SmtpMailTransport`]s, minting OAuth2 tokens when needed
pub struct SmtpTransportFactory {
    tokens: OAuth2TokenClient,
}

impl SmtpTransportFactory {
    pub fn new(tokens: OAuth2TokenClient) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TransportFactory for SmtpTransportFactory {
    async fn build(
        &self,
        settings: &TransportSettings,
    ) -> Result<Box<dyn MailTransport>, MailTransportError> {
        let (credentials, mechanisms) = match &settings.auth {
            TransportAuth::Login { user, pass } => (
                Credentials::new(user.clone(), pass.clone()),
                vec![Mechanism::Plain, Mechanism::Login],
            ),
            TransportAuth::OAuth2(oauth) => {
                let access_token = self.tokens.access_token(oauth).await?;
                (
                    Credentials::new(oauth.user.clone(), access_token),
                    vec![Mechanism::Xoauth2],
                )
            }
        };

        debug!(?settings, "Building SMTP transport");

        Ok(Box::new(SmtpMailTransport::new(
            settings,
            credentials,
            mechanisms,
        )?))
    }
}

fn parse_mailbox(value: &str, field: &str) -> Result<Mailbox, MailTransportError> {
    value.parse().map_err(|e| {
        MailTransportError::InvalidMessage(format!("Invalid {} address '{}': {}", field, value, e))
    })
}

fn parse_mailboxes(value: &str, field: &str) -> Result<Mailboxes, MailTransportError> {
    value.parse().map_err(|e| {
        MailTransportError::InvalidMessage(format!("Invalid {} address '{}': {}", field, value, e))
    })
}

/// Render an [`OutgoingMessage`] into a lettre message with a fresh `Message-ID`
pub fn build_email(message: &OutgoingMessage) -> Result<(Message, String), MailTransportError> {
    let from = parse_mailbox(&message.from, "from")?;
    let message_id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());

    let mut builder = Message::builder()
        .from(from)
        .subject(&message.subject)
        .message_id(Some(message_id.clone()));

    let mut recipients = 0;
    for to in parse_mailboxes(&message.to, "to")? {
        builder = builder.to(to);
        recipients += 1;
    }
    if recipients == 0 {
        return Err(MailTransportError::InvalidMessage(
            "No recipients specified".to_string(),
        ));
    }

    if let Some(bcc) = &message.bcc {
        builder = builder.bcc(parse_mailbox(bcc, "bcc")?);
    }

    if let Some(reply_to) = &message.reply_to {
        for mailbox in parse_mailboxes(reply_to, "reply-to")? {
            builder = builder.reply_to(mailbox);
        }
    }

    let email = if message.attachments.is_empty() {
        builder
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
    } else {
        let mut mixed = MultiPart::mixed().singlepart(SinglePart::html(message.html.clone()));
        for attachment in &message.attachments {
            let content_type = ContentType::parse(&attachment.content_type())
                .map_err(|e| MailTransportError::InvalidMessage(e.to_string()))?;
            mixed = mixed.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(mixed)
    }
    .map_err(|e| MailTransportError::InvalidMessage(e.to_string()))?;

    Ok((email, message_id))
}
