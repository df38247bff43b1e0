use std::collections::HashMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::handlers::{normalize_email, Notices};
use crate::mail::templates;
use crate::models::{Event, UserRole};
use crate::repository::UserRemoval;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppPath;
use crate::utils::response::success;

pub async fn list_customers(State(state): State<AppState>) -> Result<Response, AppError> {
    let users = state.users.list_users(Some(UserRole::Customer)).await?;
    Ok(success(users, "Customers retrieved").into_response())
}

pub async fn list_organizers(State(state): State<AppState>) -> Result<Response, AppError> {
    let users = state.users.list_users(Some(UserRole::Organizer)).await?;
    Ok(success(users, "Organizers retrieved").into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeletion {
    pub user_id: Uuid,
    pub events_removed: usize,
    pub tickets_removed: usize,
    pub notifications_failed: usize,
}

pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let email = normalize_email(&email)?;
    let removal = state
        .users
        .delete_user(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' was not found")))?;
    info!(
        user_id = %removal.user.id,
        events = removal.events.len(),
        cancelled = removal.cancelled_tickets.len(),
        own = removal.own_tickets.len(),
        "User deleted"
    );

    let (_, notifications_failed) = deletion_notices(&state, &removal)
        .await
        .deliver(&state)
        .await;

    let body = UserDeletion {
        user_id: removal.user.id,
        events_removed: removal.events.len(),
        tickets_removed: removal.cancelled_tickets.len() + removal.own_tickets.len(),
        notifications_failed,
    };
    Ok(success(body, "User deleted").into_response())
}

/// One cancellation per ticket held for a removed, still-running event, plus
/// the account deletion notice.
async fn deletion_notices(state: &AppState, removal: &UserRemoval) -> Notices {
    let events: HashMap<Uuid, &Event> = removal
        .events
        .iter()
        .filter(|e| !e.expired)
        .map(|e| (e.id, e))
        .collect();

    let mut notices = Notices::default();
    for ticket in &removal.cancelled_tickets {
        let Some(event) = events.get(&ticket.event_id) else {
            continue;
        };
        match state.users.find_user(ticket.user_id).await {
            Ok(Some(holder)) => notices.emails.push(templates::ticket_cancelled(&holder, event)),
            Ok(None) => warn!(ticket_id = %ticket.id, "Cancellation skipped: ticket holder no longer exists"),
            Err(e) => {
                error!(ticket_id = %ticket.id, error = %e, "Cancellation not sent: holder lookup failed");
                notices.unresolved += 1;
            }
        }
    }
    notices.emails.push(templates::account_deleted(&removal.user));
    notices
}

async fn set_disabled(state: &AppState, email: &str, disabled: bool) -> Result<Response, AppError> {
    let email = normalize_email(email)?;
    let user = state
        .users
        .set_user_disabled(&email, disabled)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' was not found")))?;
    info!(user_id = %user.id, disabled, "User access changed");
    let message = if disabled { "User disabled" } else { "User enabled" };
    Ok(success(user, message).into_response())
}

pub async fn disable_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    set_disabled(&state, &email, true).await
}

pub async fn enable_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    set_disabled(&state, &email, false).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEvents {
    pub expired_events: Vec<Event>,
    pub active_events: Vec<Event>,
}

pub async fn manage_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let (expired_events, active_events): (Vec<Event>, Vec<Event>) = state
        .events
        .list_events()
        .await?
        .into_iter()
        .partition(|e| e.expired);
    let body = ManagedEvents {
        expired_events,
        active_events,
    };
    Ok(success(body, "Events retrieved").into_response())
}
