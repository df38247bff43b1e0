use std::collections::HashMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::handlers::{normalize_email, Notices};
use crate::mail::templates;
use crate::models::{Event, EventSearch, EventUpdate, EventWithCreator, NewEvent, User};
use crate::repository::EventRemoval;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath, AppQuery};
use crate::utils::response::{created, success};

fn validate_schedule(
    date: Option<chrono::DateTime<Utc>>,
    today: NaiveDate,
) -> Result<(), AppError> {
    match date {
        Some(date) if date.date_naive() < today => Err(AppError::ValidationError(
            "Event date cannot be in the past".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_figures(
    capacity: Option<i32>,
    price: Option<Decimal>,
    duration: Option<i32>,
) -> Result<(), AppError> {
    if matches!(capacity, Some(c) if c <= 0) {
        return Err(AppError::ValidationError(
            "numberOfTickets must be positive".to_string(),
        ));
    }
    if matches!(price, Some(p) if p < Decimal::ZERO) {
        return Err(AppError::ValidationError(
            "ticketPrice must not be negative".to_string(),
        ));
    }
    if matches!(duration, Some(d) if d <= 0) {
        return Err(AppError::ValidationError(
            "duration must be positive".to_string(),
        ));
    }
    Ok(())
}

async fn find_organizer(state: &AppState, email: &str) -> Result<User, AppError> {
    let email = normalize_email(email)?;
    state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organizer '{email}' was not found")))
}

pub async fn create_event(
    State(state): State<AppState>,
    AppJson(mut body): AppJson<NewEvent>,
) -> Result<Response, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::ValidationError("title must not be empty".to_string()));
    }
    validate_schedule(Some(body.date), Utc::now().date_naive())?;
    validate_figures(
        Some(body.number_of_tickets),
        Some(body.ticket_price),
        Some(body.duration),
    )?;

    let organizer = find_organizer(&state, &body.email).await?;
    if organizer.disabled {
        return Err(AppError::Forbidden(format!(
            "Account '{}' is disabled",
            organizer.email
        )));
    }
    body.email = organizer.email.clone();
    let event = state
        .events
        .create_event(body.into_event(organizer.id))
        .await?;
    info!(event_id = %event.id, organizer_id = %organizer.id, "Event created");
    Ok(created(event, "Event created").into_response())
}

pub async fn search_events(
    State(state): State<AppState>,
    AppQuery(search): AppQuery<EventSearch>,
) -> Result<Response, AppError> {
    let events = state.events.search_events(&search).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn upcoming_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let now = Utc::now();
    let events: Vec<Event> = state
        .events
        .list_events()
        .await?
        .into_iter()
        .filter(|e| !e.expired && e.date >= now)
        .collect();
    Ok(success(events, "Upcoming events retrieved").into_response())
}

pub async fn organizer_events(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let organizer = find_organizer(&state, &email).await?;
    let events = state.events.events_by_creator(organizer.id, None).await?;
    Ok(success(events, "Organizer events retrieved").into_response())
}

pub async fn organizer_expired_events(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let organizer = find_organizer(&state, &email).await?;
    let events = state
        .events
        .events_by_creator(organizer.id, Some(true))
        .await?;
    Ok(success(events, "Organizer expired events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .events
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{id}' was not found")))?;
    let creator = state.users.find_user(event.created_by).await?;
    Ok(success(EventWithCreator { event, creator }, "Event retrieved").into_response())
}

pub async fn edit_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(update): AppJson<EventUpdate>,
) -> Result<Response, AppError> {
    validate_figures(update.number_of_tickets, update.ticket_price, update.duration)?;
    if matches!(&update.title, Some(title) if title.trim().is_empty()) {
        return Err(AppError::ValidationError("title must not be empty".to_string()));
    }

    let mut event = state
        .events
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{id}' was not found")))?;
    event.apply(update);
    if event.is_past(Utc::now().date_naive()) {
        event.expired = true;
    }
    if event.number_of_tickets < event.ticket_sold {
        return Err(AppError::ValidationError(format!(
            "numberOfTickets cannot be lower than the {} tickets already sold",
            event.ticket_sold
        )));
    }

    match state.events.save_event_details(&event).await? {
        Some(saved) => {
            info!(event_id = %saved.id, expired = saved.expired, "Event updated");
            Ok(success(saved, "Event updated").into_response())
        }
        // Sales landed between the read and the write.
        None => match state.events.find_event(id).await? {
            Some(current) => Err(AppError::Conflict(format!(
                "numberOfTickets cannot be lower than the {} tickets already sold",
                current.ticket_sold
            ))),
            None => Err(AppError::NotFound(format!("Event '{id}' was not found"))),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteEventParams {
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeletion {
    pub event_id: Uuid,
    pub tickets_removed: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

pub async fn delete_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(params): AppQuery<DeleteEventParams>,
) -> Result<Response, AppError> {
    let removal = state
        .events
        .delete_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{id}' was not found")))?;
    info!(event_id = %id, tickets = removal.tickets.len(), admin = params.admin, "Event deleted");

    let (notifications_sent, notifications_failed) = removal_notices(&state, &removal, params.admin)
        .await
        .deliver(&state)
        .await;

    let body = EventDeletion {
        event_id: id,
        tickets_removed: removal.tickets.len(),
        notifications_sent,
        notifications_failed,
    };
    Ok(success(body, "Event deleted").into_response())
}

/// Cancellation notices for a removed event. Expired events notify nobody.
async fn removal_notices(state: &AppState, removal: &EventRemoval, admin: bool) -> Notices {
    let event = &removal.event;
    let mut notices = Notices::default();
    if event.expired {
        return notices;
    }

    let mut holders: HashMap<Uuid, Option<User>> = HashMap::new();
    for ticket in &removal.tickets {
        if !holders.contains_key(&ticket.user_id) {
            match state.users.find_user(ticket.user_id).await {
                Ok(holder) => {
                    holders.insert(ticket.user_id, holder);
                }
                Err(e) => {
                    error!(ticket_id = %ticket.id, error = %e, "Cancellation not sent: holder lookup failed");
                    notices.unresolved += 1;
                    continue;
                }
            }
        }
        match holders.get(&ticket.user_id) {
            Some(Some(holder)) => notices.emails.push(templates::ticket_cancelled(holder, event)),
            _ => warn!(ticket_id = %ticket.id, "Cancellation skipped: ticket holder no longer exists"),
        }
    }

    if admin {
        match state.users.find_user(event.created_by).await {
            Ok(Some(organizer)) => notices
                .emails
                .push(templates::event_removed_by_admin(&organizer, event)),
            Ok(None) => warn!(event_id = %event.id, "Removal notice skipped: organizer no longer exists"),
            Err(e) => {
                error!(event_id = %event.id, error = %e, "Removal notice not sent: organizer lookup failed");
                notices.unresolved += 1;
            }
        }
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;

    use crate::models::IssueTicketRequest;
    use crate::repository::{EventRepository, MemoryStore, UserRepository};
    use crate::test_support::{
        memory_state, sample_event, sample_user, RecordingMailer, UnreachableUsers,
    };

    #[test]
    fn test_schedule_is_checked_by_day() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let earlier_today = Utc.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 0).unwrap();

        assert!(validate_schedule(Some(earlier_today), today).is_ok());
        assert!(validate_schedule(Some(yesterday), today).is_err());
        assert!(validate_schedule(None, today).is_ok());
    }

    #[test]
    fn test_figures_are_validated() {
        assert!(validate_figures(Some(10), Some(Decimal::ZERO), Some(60)).is_ok());
        assert!(validate_figures(Some(0), None, None).is_err());
        assert!(validate_figures(None, Some(Decimal::new(-1, 2)), None).is_err());
        assert!(validate_figures(None, None, Some(0)).is_err());
        assert!(validate_figures(None, None, None).is_ok());
    }

    #[tokio::test]
    async fn test_delete_stands_when_recipients_cannot_be_looked_up() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let mut state = memory_state(store.clone(), mailer.clone());
        let organizer = store.create_user(sample_user("o@example.com")).await.unwrap();
        let fan = store.create_user(sample_user("fan@example.com")).await.unwrap();
        let event = store.create_event(sample_event(organizer.id, 10, 0)).await.unwrap();
        state
            .issuance
            .issue(IssueTicketRequest {
                event_id: event.id,
                user_id: fan.id,
                quantity: 2,
            })
            .await
            .unwrap();

        state.users = Arc::new(UnreachableUsers);
        let removal = state.events.delete_event(event.id).await.unwrap().unwrap();
        let notices = removal_notices(&state, &removal, true).await;
        assert!(notices.emails.is_empty());
        assert_eq!(notices.unresolved, 2);

        let (sent, failed) = notices.deliver(&state).await;
        assert_eq!((sent, failed), (0, 2));
        assert!(mailer.sent().is_empty());
        assert!(store.find_event(event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_event_removal_notifies_nobody() {
        let store = Arc::new(MemoryStore::new());
        let state = memory_state(store.clone(), Arc::new(RecordingMailer::default()));
        let organizer = store.create_user(sample_user("o@example.com")).await.unwrap();
        let mut event = sample_event(organizer.id, 10, 0);
        event.expired = true;
        let event = store.create_event(event).await.unwrap();

        let removal = state.events.delete_event(event.id).await.unwrap().unwrap();
        let notices = removal_notices(&state, &removal, true).await;
        assert!(notices.emails.is_empty());
        assert_eq!(notices.unresolved, 0);
    }
}
