//! Dispatch result payload

use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "200";
pub const STATUS_FAILED: &str = "400";

/// `{statusCode, body}` returned for every dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub status_code: String,
    pub body: DispatchBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchResponse {
    pub fn sent(message_id: impl Into<String>, preview_url: Option<String>) -> Self {
        Self {
            status_code: STATUS_OK.to_string(),
            body: DispatchBody {
                message_id: Some(message_id.into()),
                preview_url,
                message: None,
            },
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code: STATUS_FAILED.to_string(),
            body: DispatchBody {
                message_id: None,
                preview_url: None,
                message: Some(if message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    message
                }),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Numeric form of `status_code`
    pub fn http_status(&self) -> u16 {
        if self.is_success() {
            200
        } else {
            400
        }
    }
}
