use axum::http::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{DateRangeError, RefundError, TransitionError};

#[derive(Error, Debug)]
pub enum RentalError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] DateRangeError),

    #[error("Only {available} of {name} available on {date}, {requested} requested")]
    InsufficientAvailability {
        item_id: String,
        name: String,
        date: chrono::NaiveDate,
        requested: u32,
        available: u32,
    },

    #[error("{0} is not available for booking")]
    ItemUnavailable(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error(transparent)]
    Refund(#[from] RefundError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("booking reference {0} already exists")]
    DuplicateReference(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RentalError {
    pub fn not_found(what: &str, id: &str) -> Self {
        RentalError::NotFound(format!("{} {}", what, id))
    }
}

impl From<RentalError> for AppError {
    fn from(err: RentalError) -> Self {
        let message = err.to_string();
        match err {
            RentalError::InvalidDateRange(_) => {
                AppError::rejected(StatusCode::BAD_REQUEST, "invalid_date_range", message)
            }
            RentalError::InsufficientAvailability { .. } => {
                AppError::rejected(StatusCode::CONFLICT, "insufficient_availability", message)
            }
            RentalError::ItemUnavailable(_) => {
                AppError::rejected(StatusCode::CONFLICT, "item_unavailable", message)
            }
            RentalError::InvalidTransition(_) => {
                AppError::rejected(StatusCode::CONFLICT, "invalid_transition", message)
            }
            RentalError::Refund(RefundError::WrongStatus { .. }) => {
                AppError::rejected(StatusCode::CONFLICT, "invalid_transition", message)
            }
            RentalError::Refund(RefundError::InvalidApprovedAmount { .. })
            | RentalError::Validation(_) => AppError::rejected(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                message,
            ),
            RentalError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(message)),
            RentalError::Forbidden(_) => AppError::Forbidden(anyhow::anyhow!(message)),
            RentalError::Conflict(_) | RentalError::DuplicateReference(_) => {
                AppError::Conflict(anyhow::anyhow!(message))
            }
            RentalError::InvalidCredentials => AppError::AuthError(anyhow::anyhow!(message)),
            RentalError::EmailAlreadyRegistered => AppError::Conflict(anyhow::anyhow!(message)),
            RentalError::Database(e) => AppError::DatabaseError(e.into()),
            RentalError::Internal(e) => AppError::InternalError(e),
        }
    }
}
