//! Intake pipeline errors.

use axum::http::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

/// Reasons a submission is rejected.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Form not found")]
    NotFound,

    #[error("Form is inactive")]
    Forbidden,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    InvalidPayload(String),

    #[error("No form data received")]
    EmptySubmission,

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl IntakeError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        IntakeError::InvalidPayload(message.into())
    }

    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::NotFound => StatusCode::NOT_FOUND,
            IntakeError::Forbidden => StatusCode::FORBIDDEN,
            IntakeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            IntakeError::InvalidPayload(_) | IntakeError::EmptySubmission => StatusCode::BAD_REQUEST,
            IntakeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{"detail": ...}` body. Storage details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            IntakeError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            IntakeError::NotFound => "not_found",
            IntakeError::Forbidden => "inactive",
            IntakeError::RateLimited => "rate_limited",
            IntakeError::InvalidPayload(_) => "invalid_payload",
            IntakeError::EmptySubmission => "empty",
            IntakeError::Storage(_) => "storage_error",
        }
    }
}
