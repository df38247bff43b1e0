//! Outbound email.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Logs mail instead of sending it. Selected when no SMTP host is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, bytes = email.html.len(), "Email (not sent: no SMTP host)");
        Ok(())
    }
}
