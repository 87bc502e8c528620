//! Mail transport for Postbox
//!
//! - SMTP (using lettre), with login or XOAUTH2 authentication
//! - Disposable Ethereal test mailboxes

pub mod ethereal;
pub mod oauth;
pub mod smtp;
pub mod transport;

pub use ethereal::{EtherealAccountProvider, TestAccount, TestAccountError, TestAccountProvider};
pub use oauth::OAuth2TokenClient;
pub use smtp::{SmtpMailTransport, SmtpTransportFactory};
pub use transport::{
    MailTransport, MailTransportError, OAuth2Credentials, SendReceipt, TransportAuth,
    TransportFactory, TransportSettings,
};
