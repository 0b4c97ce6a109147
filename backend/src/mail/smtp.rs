use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::MailConfig;

/// SMTP relay transport (STARTTLS).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", config.from, e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!(
            "SMTP mailer configured for {}:{} as {}",
            config.smtp_host,
            config.smtp_port,
            from
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn transport(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", email.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(to = %email.to, subject = %email.subject, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_bad_sender() {
        let config = MailConfig {
            from: "not an address".to_string(),
            ..MailConfig::default()
        };
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_recipient() {
        let mailer = SmtpMailer::new(&MailConfig::default()).unwrap();
        let email = OutgoingEmail {
            to: "nope".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        };
        assert!(matches!(
            mailer.send(&email).await,
            Err(MailError::InvalidAddress(_))
        ));
    }
}
