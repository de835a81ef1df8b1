use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::coach::session::ChatError;
use crate::llm_client::LlmError;
use crate::scan::store::StoreError;
use crate::scan::vision::VisionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service not configured: {0}")]
    Unconfigured(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Vision error: {0}")]
    Vision(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => AppError::Validation(err.to_string()),
            ChatError::Unconfigured => AppError::Unconfigured(
                "Please configure your Gemini API key in the environment variables.".to_string(),
            ),
            ChatError::Completion(e) => AppError::Llm(e),
        }
    }
}

impl From<VisionError> for AppError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::NoFace => AppError::UnprocessableEntity(err.to_string()),
            VisionError::Api(msg) => AppError::Vision(msg),
        }
    }
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
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unconfigured(msg) => {
                tracing::warn!("Unconfigured: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "UNCONFIGURED", msg.clone())
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                let code = if e.is_malformed() {
                    "LLM_MALFORMED_RESPONSE"
                } else {
                    "LLM_ERROR"
                };
                (
                    StatusCode::BAD_GATEWAY,
                    code,
                    "Sorry, I encountered an error. Please try again.".to_string(),
                )
            }
            AppError::Vision(msg) => {
                tracing::error!("Vision error: {msg}");
                (StatusCode::BAD_GATEWAY, "VISION_ERROR", msg.clone())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
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
