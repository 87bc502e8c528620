//! Postbox Core - transactional email dispatch
//!
//! Resolves sender credentials from AWS Parameter Store (or a disposable
//! Ethereal mailbox for `"test"`), sends over SMTP with lettre and optionally
//! archives each message to S3. Served over HTTP by axum.

pub mod api;
pub mod audit;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod middleware;
pub mod secrets;
pub mod server;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
