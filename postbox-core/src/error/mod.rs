//! Unified error handling for Postbox Core

use crate::domain::{AttachmentDecodeError, DispatchResponse};
use crate::email::{MailTransportError, TestAccountError};
use crate::secrets::SecretStoreError;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Everything that can stop a dispatch
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Attachment(#[from] AttachmentDecodeError),

    #[error(transparent)]
    Secret(#[from] SecretStoreError),

    #[error("Invalid credential record '{name}': {source}")]
    InvalidCredentials {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    TestAccount(#[from] TestAccountError),

    #[error(transparent)]
    Transport(#[from] MailTransportError),
}

impl AppError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Attachment(_) => "attachment",
            AppError::Secret(_) => "secret",
            AppError::InvalidCredentials { .. } => "credentials",
            AppError::TestAccount(_) => "test_account",
            AppError::Transport(_) => "transport",
        }
    }
}

// Every failure reaches the caller the same way: 400 plus the error text
impl From<AppError> for DispatchResponse {
    fn from(err: AppError) -> Self {
        DispatchResponse::failed(err.to_string())
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
