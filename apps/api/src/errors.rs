use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::job_posting::JobPostingError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Failed analysis runs are not errors at this level: they come back as a
/// `failed` run state. `AppError` covers requests that never start a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Job posting error: {0}")]
    JobPosting(#[from] JobPostingError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::JobPosting(e) => match e {
                JobPostingError::InvalidUrl(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_JOB_URL", e.to_string())
                }
                JobPostingError::NotFound => {
                    (StatusCode::NOT_FOUND, "JOB_DESCRIPTION_NOT_FOUND", e.to_string())
                }
                JobPostingError::Fetch(detail) => {
                    tracing::warn!("Job posting fetch failed: {detail}");
                    (StatusCode::BAD_GATEWAY, "JOB_FETCH_FAILED", e.to_string())
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
