use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::handlers::normalize_email;
use crate::models::{NewUser, UserUpdate};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, success};

pub async fn create_user(
    State(state): State<AppState>,
    AppJson(mut body): AppJson<NewUser>,
) -> Result<Response, AppError> {
    body.email = normalize_email(&body.email)?;
    if body.display_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "displayName must not be empty".to_string(),
        ));
    }

    let user = state
        .users
        .create_user(body.into_user(&state.default_country))
        .await?;
    info!(user_id = %user.id, role = ?user.role, "User created");
    Ok(created(user, "User created").into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Response, AppError> {
    let email = normalize_email(&email)?;
    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' was not found")))?;
    Ok(success(user, "User retrieved").into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
    AppJson(update): AppJson<UserUpdate>,
) -> Result<Response, AppError> {
    let email = normalize_email(&email)?;
    if matches!(&update.display_name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::ValidationError(
            "displayName must not be empty".to_string(),
        ));
    }

    let user = state
        .users
        .update_user(&email, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' was not found")))?;
    info!(user_id = %user.id, "User updated");
    Ok(success(user, "User updated").into_response())
}
