use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::runs::FieldError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Thread not found")]
    ThreadNotFound,

    #[error("Assistant not found")]
    AssistantNotFound,

    #[error("Run {0} not found")]
    RunNotFound(String),

    /// Route served only while feedback forwarding is configured
    #[error("Not Found")]
    FeedbackDisabled,

    #[error("Validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<FieldError>, body: Value },

    #[error("Missing user identity")]
    Unauthorized,

    #[error("Tool bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ThreadNotFound
            | AppError::AssistantNotFound
            | AppError::RunNotFound(_)
            | AppError::FeedbackDisabled => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Bootstrap(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = match self {
            AppError::Validation { errors, body } => json!({
                "detail": errors,
                "body": body,
            }),
            other => json!({ "detail": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status_and_message() {
        assert_eq!(AppError::ThreadNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ThreadNotFound.to_string(), "Thread not found");
        assert_eq!(AppError::AssistantNotFound.to_string(), "Assistant not found");
        assert_eq!(AppError::FeedbackDisabled.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::FeedbackDisabled.to_string(), "Not Found");
    }

    #[test]
    fn test_validation_is_client_error() {
        let err = AppError::Validation {
            errors: vec![],
            body: Value::Null,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(AppError::Bootstrap("sandbox down".into())
            .status_code()
            .is_server_error());
    }
}
