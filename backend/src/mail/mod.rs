//! Transactional email.
//!
//! Messages are rendered from a template kind (see [`templates`]) and
//! handed to a [`Mailer`]. Delivery is attempted once; there is no queue
//! and no retry, so a relay failure surfaces to the caller.

mod log;
mod smtp;
pub mod templates;

pub use log::LogMailer;
pub use smtp::SmtpMailer;
pub use templates::{EmailKind, RenderedEmail};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{MailConfig, MailTransport};

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn new(to: &str, rendered: RenderedEmail) -> Self {
        Self {
            to: to.to_string(),
            subject: rendered.subject,
            html: rendered.html,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name for logs (e.g. "smtp").
    fn transport(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Build the mailer selected by configuration.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Smtp => Ok(Arc::new(SmtpMailer::new(config)?)),
        MailTransport::Log => Ok(Arc::new(LogMailer::new())),
    }
}
