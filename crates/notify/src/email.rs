//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers notifications as emails through an SMTP server. Port 465 uses
//! implicit TLS, other ports STARTTLS unless TLS is disabled.

use bow_core::config::MailConfig;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::traits::{Notification, Notifier, NotifyError};

/// Sends notifications as emails via SMTP, one message per notification
/// addressed to that notification's recipients.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::Config(format!("{addr}: {e}")))
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP settings.
    ///
    /// - `smtp_port`: defaults to 587.
    /// - `tls`: `false` sends in plaintext (local relays, Mailpit); port
    ///   465 always uses implicit TLS.
    /// - `credentials`: username and password, both or neither.
    pub fn from_config(
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: bool,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, NotifyError> {
        let from_mailbox = parse_mailbox(from)?;
        let port = smtp_port.unwrap_or(587);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from_mailbox,
        })
    }

    pub fn from_mail_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| NotifyError::Config("MAIL_HOST is not set".to_string()))?;
        let credentials = match (&config.username, &config.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };
        Self::from_config(host, config.port, config.tls, credentials, &config.from_mailbox())
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.recipients.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let mut message_builder = Message::builder()
            .from(self.from.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &notification.recipients {
            message_builder = message_builder.to(parse_mailbox(recipient)?);
        }

        let email = message_builder
            .subject(&notification.subject)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %notification.subject,
            recipients = notification.recipients.len(),
            "notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            mailer: "smtp".into(),
            host: Some("smtp.example.com".into()),
            port: Some(587),
            tls: true,
            username: Some("mailer".into()),
            password: Some("secret".into()),
            from_address: "bow@example.com".into(),
            from_name: "Book of Work".into(),
            app_url: "https://bow.example.com".into(),
        }
    }

    #[test]
    fn parse_email_with_display_name() {
        let mb = parse_mailbox("Book of Work <bow@example.com>").unwrap();
        assert_eq!(mb.email.to_string(), "bow@example.com");
    }

    #[test]
    fn parse_invalid_email_address() {
        assert!(parse_mailbox("not-an-email").is_err());
    }

    #[tokio::test]
    async fn from_mail_config_valid() {
        let notifier = EmailNotifier::from_mail_config(&mail_config()).unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }

    #[test]
    fn missing_host_is_config_error() {
        let mut config = mail_config();
        config.host = None;
        let err = EmailNotifier::from_mail_config(&config).unwrap_err().to_string();
        assert!(err.contains("MAIL_HOST"), "got: {err}");
    }

    #[test]
    fn invalid_from_address() {
        let result = EmailNotifier::from_config("smtp.example.com", None, true, None, "bad-address");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[tokio::test]
    async fn implicit_tls_and_plaintext_ports() {
        assert!(EmailNotifier::from_config("smtp.example.com", Some(465), true, None, "a@example.com").is_ok());
        assert!(EmailNotifier::from_config("localhost", Some(1025), false, None, "a@example.com").is_ok());
    }

    #[tokio::test]
    async fn empty_recipients_rejected_before_connecting() {
        let notifier = EmailNotifier::from_mail_config(&mail_config()).unwrap();
        let err = notifier
            .send(&Notification::new("s", "b", vec![]))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("at least one recipient"), "got: {err}");
    }
}
