use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::state::{AppState, SessionMetadata};

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: BTreeMap<String, SessionMetadata>,
}

/// List every session seen since startup
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.sessions.all(),
    })
}

/// Fetch one session's metadata
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionMetadata>> {
    state
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("unknown session_id".to_string()))
}
