use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, sessions};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .layer(TraceLayer::new_for_http())
}
