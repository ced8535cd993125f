//! Routes notifications to the configured channels.
//!
//! Every message goes to every channel. Individual channel failures don't
//! block other channels.

use bow_core::config::MailConfig;

use crate::email::EmailNotifier;
use crate::log::LogNotifier;
use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// A dispatcher that sends nothing.
    pub fn empty() -> Self {
        Self { channels: Vec::new() }
    }

    /// Build the channel set from mail settings: SMTP when `MAIL_MAILER=smtp`
    /// and a host is set, otherwise the log mailer.
    pub fn from_mail_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let channel: Box<dyn Notifier> = if config.is_smtp() {
            Box::new(EmailNotifier::from_mail_config(config)?)
        } else {
            if config.mailer == "smtp" {
                tracing::warn!("MAIL_MAILER=smtp but MAIL_HOST is not set, falling back to log mailer");
            }
            Box::new(LogNotifier::new())
        };
        tracing::info!(channel = channel.channel_name(), "mail channel configured");
        Ok(Self::new(vec![channel]))
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    /// Send a notification to all channels and report per-channel results.
    pub async fn dispatch(&self, notification: &Notification) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(subject = %notification.subject, "No notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::debug!(
                        channel = channel.channel_name(),
                        duration_ms,
                        "Notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                recipients: notification.recipients.len(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Send a test message through one channel by index.
    pub async fn test_channel(&self, channel_index: usize, recipient: &str) -> Result<(), NotifyError> {
        let channel = self
            .channels
            .get(channel_index)
            .ok_or_else(|| NotifyError::Config(format!("Channel index {channel_index} out of range")))?;
        channel.test(recipient).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn notification() -> Notification {
        Notification::new("test", "test body", vec!["ada@example.com".to_string()])
    }

    #[tokio::test]
    async fn reminder_reaches_every_channel() {
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![
            Box::new(MockNotifier { name: "a".into(), send_count: count_a.clone(), should_fail: false }),
            Box::new(MockNotifier { name: "b".into(), send_count: count_b.clone(), should_fail: false }),
        ]);

        let results = dispatcher.dispatch(&notification()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success && r.recipients == 1));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn smtp_outage_does_not_stop_log_channel() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![
            Box::new(MockNotifier {
                name: "fail".into(),
                send_count: Arc::new(AtomicUsize::new(0)),
                should_fail: true,
            }),
            Box::new(MockNotifier { name: "ok".into(), send_count: count.clone(), should_fail: false }),
        ]);

        let results = dispatcher.dispatch(&notification()).await;
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("Configuration error: mock failure"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_dispatcher_returns_nothing() {
        assert!(Dispatcher::empty().dispatch(&notification()).await.is_empty());
        assert!(Dispatcher::empty().test_channel(0, "ada@example.com").await.is_err());
    }

    #[test]
    fn log_mailer_without_smtp_host() {
        let config = MailConfig {
            mailer: "smtp".into(),
            host: None,
            port: None,
            tls: true,
            username: None,
            password: None,
            from_address: "bow@example.com".into(),
            from_name: "Book of Work".into(),
            app_url: "http://localhost:3000".into(),
        };
        let dispatcher = Dispatcher::from_mail_config(&config).unwrap();
        assert_eq!(dispatcher.channel_names(), vec!["log"]);
    }
}
