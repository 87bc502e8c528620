//! Outgoing message assembled per request

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Serialize, Serializer};

use super::credential::AuditMode;

/// A decoded attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    /// Archived as base64, the same encoding the request carried
    #[serde(serialize_with = "serialize_base64")]
    pub content: Vec<u8>,
    pub encoding: &'static str,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
            encoding: "base64",
        }
    }

    /// MIME type guessed from the file extension
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

fn serialize_base64<S>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(content))
}

/// Message handed to a [`crate::email::MailTransport`]; its JSON form is the audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
}

impl OutgoingMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            attachments: Vec::new(),
            reply_to: None,
            bcc: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_reply_to(mut self, reply_to: Option<String>) -> Self {
        self.reply_to = reply_to.filter(|r| !r.trim().is_empty());
        self
    }

    /// In `bcc` audit mode the sending mailbox receives its own copy
    pub fn with_audit(mut self, audit: AuditMode) -> Self {
        self.bcc = match audit {
            AuditMode::Bcc => Some(self.from.clone()),
            AuditMode::None | AuditMode::S3 => None,
        };
        self
    }

    pub fn to_audit_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message() -> OutgoingMessage {
        OutgoingMessage::new(
            "\"Acme\" <noreply@acme.test>",
            "bob@example.com",
            "Hello",
            "<p>Hello</p>",
        )
    }

    #[test]
    fn test_bcc_audit_copies_from() {
        let msg = message().with_audit(AuditMode::Bcc);
        assert_eq!(msg.bcc.as_deref(), Some(msg.from.as_str()));
    }

    #[test]
    fn test_other_audit_modes_leave_bcc_unset() {
        assert!(message().with_audit(AuditMode::None).bcc.is_none());
        assert!(message().with_audit(AuditMode::S3).bcc.is_none());
    }

    #[test]
    fn test_blank_reply_to_is_dropped() {
        assert!(message().with_reply_to(Some("  ".to_string())).reply_to.is_none());
        assert_eq!(
            message()
                .with_reply_to(Some("help@acme.test".to_string()))
                .reply_to
                .as_deref(),
            Some("help@acme.test")
        );
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(Attachment::new("report.pdf", vec![]).content_type(), "application/pdf");
        assert_eq!(Attachment::new("notes.txt", vec![]).content_type(), "text/plain");
        assert_eq!(
            Attachment::new("blob", vec![]).content_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_audit_json_shape() {
        let msg = message()
            .with_attachments(vec![Attachment::new("a.txt", b"hello".to_vec())])
            .with_audit(AuditMode::Bcc);

        let value: serde_json::Value = serde_json::from_slice(&msg.to_audit_json().unwrap()).unwrap();

        assert_eq!(value["from"], "\"Acme\" <noreply@acme.test>");
        assert_eq!(value["to"], "bob@example.com");
        assert_eq!(value["subject"], "Hello");
        assert_eq!(value["html"], "<p>Hello</p>");
        assert_eq!(value["bcc"], value["from"]);
        assert_eq!(value["attachments"][0]["filename"], "a.txt");
        assert_eq!(value["attachments"][0]["content"], "aGVsbG8=");
        assert_eq!(value["attachments"][0]["encoding"], "base64");
        assert!(value.get("replyTo").is_none());
    }
}
