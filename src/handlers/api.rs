use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::state::AppState;

/// Health check handler
/// Reports the loaded model, language and negotiated backend
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.config.model_name(),
        "language": state.config.language,
        "pcm_input": state.config.pcm_input,
        "backend": state.backend_name(),
    }))
}
