use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::handlers::normalize_email;
use crate::services::statistics;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppPath;
use crate::utils::response::success;

pub async fn record_visit(State(state): State<AppState>) -> Result<Response, AppError> {
    let traffic = state.traffic.record_visit(Utc::now().date_naive()).await?;
    Ok(success(traffic, "Visit recorded").into_response())
}

pub async fn event_popularity(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    Ok(success(statistics::event_popularity(&events), "Event popularity retrieved").into_response())
}

pub async fn sales_by_category(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    Ok(success(statistics::sales_by_category(&events), "Sales by category retrieved").into_response())
}

pub async fn daily(State(state): State<AppState>) -> Result<Response, AppError> {
    let dashboard = statistics::daily_dashboard(&state, Utc::now()).await?;
    Ok(success(dashboard, "Daily statistics retrieved").into_response())
}

pub async fn admin_overview(State(state): State<AppState>) -> Result<Response, AppError> {
    let overview = statistics::admin_overview(&state, Utc::now()).await?;
    Ok(success(overview, "Admin statistics retrieved").into_response())
}

pub async fn organizer_overview(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let email = normalize_email(&email)?;
    let organizer = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organizer '{email}' was not found")))?;
    let overview = statistics::organizer_overview(&state, &organizer, Utc::now()).await?;
    Ok(success(overview, "Organizer statistics retrieved").into_response())
}
