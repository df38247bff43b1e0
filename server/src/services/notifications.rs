//! Mail delivery with bounded retries.
//!
//! Notifications are never sent inline with issuance. Callers hand fully
//! rendered emails to the dispatcher, which retries transport failures up to
//! `max_attempts` times with linear backoff. Address and build errors are not
//! retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::mail::{Email, MailError, Mailer};

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    max_attempts: u32,
    backoff: Duration,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, max_attempts: u32) -> Self {
        Self {
            mailer,
            max_attempts: max_attempts.max(1),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        let mut attempt = 1;
        loop {
            match self.mailer.send(email).await {
                Ok(()) => {
                    debug!(to = %email.to, subject = %email.subject, attempt, "Email delivered");
                    return Ok(());
                }
                Err(e @ MailError::Transport(_)) if attempt < self.max_attempts => {
                    warn!(to = %email.to, attempt, error = %e, "Email delivery failed; retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(to = %email.to, attempt, error = %e, "Email delivery failed");
                    return Err(e);
                }
            }
        }
    }

    /// Delivers every email, continuing past failures. Returns how many failed.
    pub async fn deliver_all(&self, emails: Vec<Email>) -> usize {
        let mut failed = 0;
        for email in &emails {
            if self.deliver(email).await.is_err() {
                failed += 1;
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingMailer;

    fn email(to: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Subject".to_string(),
            html: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mailer = Arc::new(RecordingMailer::failing(2));
        let dispatcher =
            NotificationDispatcher::new(mailer.clone(), 3).with_backoff(Duration::ZERO);

        dispatcher.deliver(&email("a@example.com")).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mailer = Arc::new(RecordingMailer::failing(5));
        let dispatcher =
            NotificationDispatcher::new(mailer.clone(), 3).with_backoff(Duration::ZERO);

        let err = dispatcher.deliver(&email("a@example.com")).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_all_counts_failures() {
        let mailer = Arc::new(RecordingMailer::failing(1));
        let dispatcher =
            NotificationDispatcher::new(mailer.clone(), 1).with_backoff(Duration::ZERO);

        let failed = dispatcher
            .deliver_all(vec![email("a@example.com"), email("b@example.com")])
            .await;
        assert_eq!(failed, 1);
        assert_eq!(mailer.sent()[0].to, "b@example.com");
    }
}
