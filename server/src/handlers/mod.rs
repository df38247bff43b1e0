use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::mail::Email;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod admin;
pub mod events;
pub mod stats;
pub mod tickets;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventfinder-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Emails are stored lowercase; path segments are normalized the same way.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::ValidationError(format!(
            "'{}' is not a valid email address",
            raw
        ))),
    }
}

/// Emails owed after a committed removal. `unresolved` counts recipients whose
/// lookup failed; the removal itself stands.
#[derive(Debug, Default)]
pub(crate) struct Notices {
    pub emails: Vec<Email>,
    pub unresolved: usize,
}

impl Notices {
    /// Delivers every email and returns `(sent, failed)`, unresolved recipients
    /// counted as failed.
    pub async fn deliver(self, state: &AppState) -> (usize, usize) {
        let attempted = self.emails.len();
        let undelivered = state.notifier.deliver_all(self.emails).await;
        (attempted - undelivered, undelivered + self.unresolved)
    }
}
