//! Inbound send request and attachment normalization

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::message::Attachment;

/// Padding optional, stray trailing bits tolerated
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Secret name that routes a send through a disposable test mailbox
pub const TEST_SECRET_NAME: &str = "test";

/// Request body accepted by the dispatcher
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Parameter name holding the sender credentials, or `"test"`
    #[validate(length(min = 1))]
    pub secret_name: String,

    /// `email`, `Name <email>`, or a comma-separated list of either
    #[validate(length(min = 1))]
    pub to_address: String,

    #[serde(default)]
    pub title: String,

    /// HTML body
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_attachment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentPayload>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// One entry of the multi-attachment request shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    pub attachment_name: String,
    pub encoded_attachment: String,
}

#[derive(Debug, thiserror::Error)]
#[error("Attachment '{filename}' is not valid base64: {source}")]
pub struct AttachmentDecodeError {
    pub filename: String,
    #[source]
    pub source: base64::DecodeError,
}

impl SendRequest {
    pub fn new(
        secret_name: impl Into<String>,
        to_address: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            secret_name: secret_name.into(),
            to_address: to_address.into(),
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Whether this request asks for the disposable test mailbox
    pub fn is_test(&self) -> bool {
        self.secret_name == TEST_SECRET_NAME
    }

    /// Collapse both attachment shapes into one decoded sequence.
    ///
    /// The list shape wins when present; the single shape is only used when
    /// both its name and payload are set.
    pub fn normalized_attachments(&self) -> Result<Vec<Attachment>, AttachmentDecodeError> {
        if let Some(list) = &self.attachments {
            return list
                .iter()
                .map(|a| decode_attachment(&a.attachment_name, &a.encoded_attachment))
                .collect();
        }

        match (&self.attachment_name, &self.encoded_attachment) {
            (Some(name), Some(encoded)) => Ok(vec![decode_attachment(name, encoded)?]),
            _ => Ok(Vec::new()),
        }
    }
}

fn decode_attachment(filename: &str, encoded: &str) -> Result<Attachment, AttachmentDecodeError> {
    // Line breaks are dropped and URL-safe characters map onto the standard alphabet
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let content = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|source| AttachmentDecodeError {
            filename: filename.to_string(),
            source,
        })?;

    Ok(Attachment::new(filename, content))
}
