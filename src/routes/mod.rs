pub mod api;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the full application router: REST endpoints plus the transcription
/// WebSocket, with permissive CORS for browser clients.
pub fn create_app(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(ws::create_ws_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
