//! The `log` mailer: writes messages to the tracing output instead of
//! sending them. Used in development and whenever SMTP is not configured.

use std::sync::{Arc, Mutex};

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            channel = "log",
            to = %notification.recipients.join(", "),
            subject = %notification.subject,
            "mail (not sent)\n{}",
            notification.body
        );
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(notification.clone());
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages() {
        let notifier = LogNotifier::new();
        notifier.test("ada@example.com").await.unwrap();
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec!["ada@example.com".to_string()]);
        assert!(sent[0].subject.starts_with("[TEST]"));
    }
}
