use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::mail::MailError;
use crate::repository::RepoError;
use crate::services::IssuanceError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event is sold out")]
    SoldOut {
        attempted_total: i64,
        ticket_sold: i32,
        number_of_tickets: i32,
    },

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::SoldOut { .. } => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::SoldOut { .. } => "SOLD_OUT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::SoldOut { attempted_total, number_of_tickets, .. } => {
                warn!(attempted_total, number_of_tickets, "Request rejected: sold out");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::SoldOut { .. } => self.to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::ExternalServiceError(_) => "An external service failed".to_string(),
            AppError::InternalServerError(_) => "Internal server error".to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::SoldOut {
                attempted_total,
                ticket_sold,
                number_of_tickets,
            } => Some(json!({
                "attemptedTotal": attempted_total,
                "ticketSold": ticket_sold,
                "numberOfTickets": number_of_tickets,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        error_response(
            self.code(),
            self.public_message(),
            self.details(),
            self.status_code(),
        )
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(what) => AppError::Conflict(format!("{what} already exists")),
            RepoError::Database(e) => AppError::DatabaseError(e),
            RepoError::DuplicateCode => {
                AppError::InternalServerError("ticket code collision".to_string())
            }
        }
    }
}

impl From<IssuanceError> for AppError {
    fn from(e: IssuanceError) -> Self {
        match e {
            IssuanceError::InvalidQuantity(q) => AppError::ValidationError(q.to_string()),
            IssuanceError::UserNotFound(_) | IssuanceError::EventNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            IssuanceError::UserDisabled(_) => AppError::Forbidden(e.to_string()),
            IssuanceError::SoldOut {
                attempted_total,
                ticket_sold,
                number_of_tickets,
            } => AppError::SoldOut {
                attempted_total,
                ticket_sold,
                number_of_tickets,
            },
            IssuanceError::DuplicateCode => AppError::InternalServerError(e.to_string()),
            IssuanceError::Repository { stage, source } => {
                error!(stage = %stage, error = ?source, "Issuance storage failure");
                AppError::from(source)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        AppError::ExternalServiceError(e.to_string())
    }
}
