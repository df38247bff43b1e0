use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::mail::templates;
use crate::models::{Event, TicketFilter};
use crate::repository::RepoError;
use crate::state::AppState;
use crate::utils::time::day_bounds;

/// Emails every holder of a ticket for an event dated tomorrow (UTC).
/// Returns the number of reminders delivered.
pub async fn send_event_reminders(state: &AppState, now: DateTime<Utc>) -> Result<usize, RepoError> {
    let (from, to) = day_bounds(now, 1);
    let events = state.events.events_between(from, to).await?;
    if events.is_empty() {
        return Ok(0);
    }

    let by_id: HashMap<Uuid, Event> = events.into_iter().map(|e| (e.id, e)).collect();
    let tickets = state
        .tickets
        .list_tickets(&TicketFilter {
            event_ids: Some(by_id.keys().copied().collect()),
            ..TicketFilter::default()
        })
        .await?;

    let mut delivered = 0;
    for ticket in &tickets {
        let Some(event) = by_id.get(&ticket.event_id) else {
            continue;
        };
        let Some(holder) = state.users.find_user(ticket.user_id).await? else {
            warn!(ticket_id = %ticket.id, "Reminder skipped: ticket holder no longer exists");
            continue;
        };
        let email = templates::event_reminder(&holder, ticket, event);
        if state.notifier.deliver(&email).await.is_ok() {
            delivered += 1;
            info!(ticket_id = %ticket.id, to = %holder.email, "Reminder email sent");
        }
    }
    Ok(delivered)
}

pub async fn scheduled_reminders(state: &AppState) {
    if let Err(e) = send_event_reminders(state, Utc::now()).await {
        error!(error = %e, "Reminder job failed");
    }
}
