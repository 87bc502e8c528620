//! Domain types for mail dispatch

pub mod credential;
pub mod message;
pub mod request;
pub mod response;

pub use credential::{
    format_from_address, AuditMode, CredentialAuth, CredentialRecord, OAUTH2_EXPIRES_HINT_SECS,
};
pub use message::{Attachment, OutgoingMessage};
pub use request::{AttachmentDecodeError, AttachmentPayload, SendRequest, TEST_SECRET_NAME};
pub use response::{DispatchBody, DispatchResponse, STATUS_FAILED, STATUS_OK};
