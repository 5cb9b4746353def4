//! WebSocket error types and handling

use axum::extract::ws::{CloseFrame, close_code};
use thiserror::Error;

use crate::core::pipeline::PipelineError;

/// Reasons a transcription session cannot be opened
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// No decoder backend was negotiated at startup
    #[error("Transcription engine is not available")]
    EngineUnavailable,

    /// The session's processor could not be created
    #[error("Failed to start transcription session: {0}")]
    SessionStart(#[from] PipelineError),
}

impl WebSocketError {
    /// Close frame sent before dropping the connection
    pub fn close_frame(&self) -> CloseFrame {
        CloseFrame {
            code: close_code::ERROR,
            reason: self.to_string().into(),
        }
    }
}

/// Result type for WebSocket operations
pub type WebSocketResult<T> = Result<T, WebSocketError>;
