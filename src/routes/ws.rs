use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws;
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router
///
/// The transcription endpoint is served at `/asr`; `/ws` is kept as an alias
/// for older clients.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/asr", get(ws::asr_handler))
        .route("/ws", get(ws::asr_handler))
        .layer(TraceLayer::new_for_http())
}
