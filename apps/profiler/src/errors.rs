use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type shared by both front ends.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`,
/// and maps onto a process exit code for the CLI.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schema load error: {0}")]
    SchemaLoad(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model timed out: {0}")]
    ModelTimeout(String),

    #[error("Response parse error: {0}")]
    ResponseParse(String),

    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable error kind reported to callers in the `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::SchemaLoad(_) => "SchemaLoadError",
            AppError::ModelUnavailable(_) => "ModelUnavailableError",
            AppError::ModelTimeout(_) => "ModelTimeoutError",
            AppError::ResponseParse(_) => "ResponseParseError",
            AppError::Config(_) => "ConfigError",
            AppError::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SchemaLoad(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable(_) | AppError::ResponseParse(_) => StatusCode::BAD_GATEWAY,
            AppError::ModelTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) | AppError::Internal(_) => 1,
            AppError::Config(_) => 2,
            AppError::SchemaLoad(_) => 3,
            AppError::ModelUnavailable(_) => 4,
            AppError::ModelTimeout(_) => 5,
            AppError::ResponseParse(_) => 6,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Config(e) => {
                tracing::error!("Configuration error: {e:#}");
                "The service is misconfigured".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::ModelUnavailable(msg)
            | AppError::ModelTimeout(msg)
            | AppError::ResponseParse(msg) => {
                tracing::warn!("{}: {msg}", self.kind());
                msg.clone()
            }
            AppError::Validation(msg) | AppError::SchemaLoad(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
