//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use confab_core::assistants::AssistantsError;
use confab_core::turn::TurnError;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// JSON body for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Raw upstream payload, when one is available for diagnosis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, details) = match self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m, None),
            AppError::Config(m) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", m, None),
            AppError::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_error",
                message,
                details,
            ),
            AppError::RunFailed(m) => (StatusCode::INTERNAL_SERVER_ERROR, "run_failed", m, None),
            AppError::Internal(m) => {
                tracing::error!("internal error: {m}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            details,
        });
        (status, body).into_response()
    }
}

impl From<AssistantsError> for AppError {
    fn from(e: AssistantsError) -> Self {
        match e {
            AssistantsError::Upstream { status, body } => {
                // Pass the payload through as JSON when it parses, raw text
                // otherwise, so nothing is lost for diagnosis.
                let details = serde_json::from_str::<serde_json::Value>(&body)
                    .unwrap_or(serde_json::Value::String(body));
                AppError::Upstream {
                    message: format!("assistants API returned {status}"),
                    details: Some(details),
                }
            }
            AssistantsError::Transport(e) => AppError::Upstream {
                message: format!("upstream request failed: {e}"),
                details: None,
            },
            AssistantsError::Payload(m) => AppError::Upstream {
                message: format!("malformed upstream payload: {m}"),
                details: None,
            },
        }
    }
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyMessage => AppError::Validation("message is required".into()),
            TurnError::Upstream(e) => AppError::from(e),
            TurnError::RunFailed { run_id, details } => {
                AppError::RunFailed(format!("run {run_id} failed: {details}"))
            }
        }
    }
}
