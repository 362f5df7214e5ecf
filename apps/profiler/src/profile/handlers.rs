//! Axum route handlers for the Profile API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::profile::generator::GenerationRequest;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const MODEL_HEADER: HeaderName = HeaderName::from_static("x-profile-model");
pub const ATTEMPTS_HEADER: HeaderName = HeaderName::from_static("x-profile-attempts");

/// POST /profiles/generate
///
/// Runs the generation pipeline and returns the profile object itself as the
/// body. Request id, model and attempt count travel in response headers.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let outcome = state.generator.generate(request).await?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&outcome.request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&outcome.model) {
        headers.insert(MODEL_HEADER, value);
    }
    headers.insert(ATTEMPTS_HEADER, HeaderValue::from(outcome.attempts));

    Ok((headers, Json(Value::Object(outcome.profile))))
}
