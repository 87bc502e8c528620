//! Business logic layer

pub mod dispatch;

pub use dispatch::{DispatchOptions, DispatchOutcome, MailDispatcher, ResolvedSender};
