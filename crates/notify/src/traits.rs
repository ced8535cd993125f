//! Notifier trait definition and shared error types.

use std::collections::HashMap;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// The rendered subject line.
    pub subject: String,
    /// The rendered plain-text body.
    pub body: String,
    /// Recipient addresses, e.g. `"ada@example.com"` or `"Ada <ada@example.com>"`.
    pub recipients: Vec<String>,
    /// Additional metadata (notification kind, subject record id).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            recipients,
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Test delivery with a sample message to one address.
    async fn test(&self, recipient: &str) -> Result<(), NotifyError> {
        let test_notification = Notification::new(
            "[TEST] Book of Work mail check",
            "This is a test message from Book of Work. If you can read it, mail delivery works.",
            vec![recipient.to_string()],
        )
        .with_meta("kind", "test");
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "email", "log").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchResult {
    pub channel: String,
    pub recipients: usize,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
