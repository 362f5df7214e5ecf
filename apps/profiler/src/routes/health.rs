use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and default model.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "hr-profile-generator",
        "version": env!("CARGO_PKG_VERSION"),
        "default_model": state.generator.defaults().model,
    }))
}
