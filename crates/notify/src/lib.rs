//! Outbound mail for Book of Work.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - SMTP email and log notifier implementations
//! - Minijinja templates for every notification kind
//! - Dispatcher that sends a message through all configured channels

pub mod dispatcher;
pub mod email;
pub mod log;
pub mod templating;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use log::LogNotifier;
pub use templating::{LineContext, MessageContext, TemplateRenderer};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
