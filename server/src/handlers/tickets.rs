use std::collections::HashMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::handlers::normalize_email;
use crate::mail::templates;
use crate::models::{Event, IssueTicketRequest, Ticket, TicketDetails, TicketFilter};
use crate::repository::CheckInOutcome;
use crate::services::ScannableImage;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, empty_success, success};
use crate::utils::time::start_of_day;

#[derive(Debug, Serialize)]
pub struct IssuedTicketBody {
    pub ticket: Ticket,
    pub event: Event,
}

pub async fn issue_ticket(
    State(state): State<AppState>,
    AppJson(request): AppJson<IssueTicketRequest>,
) -> Result<Response, AppError> {
    let issued = state.issuance.issue(request).await?;
    let body = IssuedTicketBody {
        ticket: issued.ticket,
        event: issued.event,
    };
    Ok(created(body, "Ticket issued").into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTickets {
    pub active_tickets: Vec<TicketDetails>,
    pub expired_tickets: Vec<TicketDetails>,
}

pub async fn user_tickets(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let email = normalize_email(&email)?;
    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' was not found")))?;

    let tickets = state
        .tickets
        .list_tickets(&TicketFilter {
            user_id: Some(user.id),
            ..TicketFilter::default()
        })
        .await?;

    let mut events: HashMap<Uuid, Option<Event>> = HashMap::new();
    let mut details = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        if !events.contains_key(&ticket.event_id) {
            let event = state.events.find_event(ticket.event_id).await?;
            events.insert(ticket.event_id, event);
        }
        let event = events.get(&ticket.event_id).cloned().flatten();
        details.push(TicketDetails {
            ticket,
            event,
            user: None,
        });
    }
    details.sort_by_key(|d| d.event.as_ref().map(|e| e.date));

    let today = start_of_day(Utc::now());
    let (active_tickets, expired_tickets): (Vec<TicketDetails>, Vec<TicketDetails>) = details
        .into_iter()
        .partition(|d| d.event.as_ref().is_some_and(|e| e.date >= today));

    let body = UserTickets {
        active_tickets,
        expired_tickets,
    };
    Ok(success(body, "Tickets retrieved").into_response())
}

pub async fn ticket_details(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .find_ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;
    let event = state.events.find_event(ticket.event_id).await?;
    let user = state.users.find_user(ticket.user_id).await?;
    Ok(success(TicketDetails { ticket, event, user }, "Ticket retrieved").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrImageRequest {
    pub qr_image: String,
}

pub async fn set_qr_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<QrImageRequest>,
) -> Result<Response, AppError> {
    let image = body.qr_image.trim();
    let accepted = ["https://", "http://", "data:image/"];
    if !accepted.iter().any(|prefix| image.starts_with(prefix)) {
        return Err(AppError::ValidationError(
            "qrImage must be an http(s) URL or an image data URL".to_string(),
        ));
    }

    let ticket = state
        .tickets
        .set_qr_image(id, Some(image.to_string()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;
    info!(ticket_id = %ticket.id, "Scannable image replaced");
    Ok(success(ticket, "Scannable image updated").into_response())
}

pub async fn regenerate_qr_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .find_ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;

    let ScannableImage::Rendered(image) = state.codes.render(&ticket.qr_payload) else {
        return Err(AppError::InternalServerError(format!(
            "scannable image for ticket {id} could not be rendered"
        )));
    };
    let ticket = state
        .tickets
        .set_qr_image(id, Some(image))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;
    info!(ticket_id = %ticket.id, "Scannable image regenerated");
    Ok(success(ticket, "Scannable image regenerated").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub ticket_code: String,
}

pub async fn check_in(
    State(state): State<AppState>,
    AppJson(body): AppJson<CheckInRequest>,
) -> Result<Response, AppError> {
    match state.tickets.check_in(body.ticket_code.trim()).await? {
        CheckInOutcome::CheckedIn(ticket) => {
            info!(ticket_id = %ticket.id, "Ticket checked in");
            Ok(success(ticket, "Ticket checked in").into_response())
        }
        CheckInOutcome::AlreadyCheckedIn(ticket) => Err(AppError::ValidationError(format!(
            "Ticket {} has already been checked in",
            ticket.id
        ))),
        CheckInOutcome::UnknownCode => Err(AppError::NotFound("Ticket code was not found".to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequest {
    pub user_email: String,
    pub name: String,
    pub qr_payload: String,
    pub ticket_code: String,
}

pub async fn send_receipt(
    State(state): State<AppState>,
    AppJson(body): AppJson<ReceiptRequest>,
) -> Result<Response, AppError> {
    let to = normalize_email(&body.user_email)?;
    let ticket = state
        .tickets
        .find_ticket_by_payload(&body.qr_payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket was not found".to_string()))?;
    if ticket.ticket_code != body.ticket_code {
        return Err(AppError::ValidationError(
            "ticketCode does not match the ticket".to_string(),
        ));
    }
    let event = state
        .events
        .find_event(ticket.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", ticket.event_id)))?;

    let email = templates::receipt(&to, &body.name, &ticket, &event);
    state.notifier.deliver(&email).await?;
    info!(ticket_id = %ticket.id, "Receipt sent");
    Ok(empty_success("Receipt sent").into_response())
}
