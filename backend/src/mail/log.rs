use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingEmail};

/// Development transport: writes messages to the log instead of sending.
///
/// Bodies (which include OTP codes) are only emitted at debug level.
#[derive(Debug, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn transport(&self) -> &'static str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Mail (log transport)");
        tracing::debug!(to = %email.to, "Mail body:\n{}", email.html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer::new();
        let email = OutgoingEmail {
            to: "a@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        };
        assert!(mailer.send(&email).await.is_ok());
        assert_eq!(mailer.transport(), "log");
    }
}
