//! Axum WebSocket handler
//!
//! This module contains the WebSocket upgrade handler and the per-connection
//! session loop.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::pipeline::{AudioPipeline, ResultMessage};
use crate::state::AppState;

use super::{
    error::{WebSocketError, WebSocketResult},
    messages::OutgoingMessage,
    query::SessionQuery,
};

/// WebSocket transcription handler
/// Upgrades the HTTP connection to WebSocket for real-time transcription
pub async fn asr_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<SessionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Transcription WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_asr_socket(socket, query, state))
}

/// Run one transcription session for the lifetime of the connection
async fn handle_asr_socket(mut socket: WebSocket, query: SessionQuery, app_state: Arc<AppState>) {
    let (session_id, pipeline, mut results) = match start_session(&query, &app_state) {
        Ok(started) => started,
        Err(e) => {
            warn!("Refusing transcription session: {}", e);
            let _ = socket.send(Message::Close(Some(e.close_frame()))).await;
            return;
        }
    };
    info!(session_id = %session_id, "Transcription session opened");

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    let config = OutgoingMessage::Config {
        use_audio_worklet: app_state.config.pcm_input,
    };
    if let Err(e) = send_message(&mut sender, &config).await {
        info!(session_id = %session_id, "Client left before config was sent: {}", e);
        pipeline.cleanup().await;
        return;
    }

    // Outbound loop: forward results until the pipeline closes the stream
    let sender_task = tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            if let Err(e) = send_message(&mut sender, &OutgoingMessage::from(result)).await {
                debug!("Failed to send result, client gone: {}", e);
                return;
            }
        }
        if let Err(e) = send_message(&mut sender, &OutgoingMessage::ReadyToStop).await {
            debug!("Failed to send ready_to_stop: {}", e);
        }
    });

    // Inbound loop: forward audio frames until the client goes away
    loop {
        match receiver.next().await {
            Some(Ok(msg)) => {
                if !process_message(msg, &pipeline).await {
                    break;
                }
            }
            Some(Err(e)) => {
                info!(session_id = %session_id, "WebSocket receive error: {}", e);
                break;
            }
            None => {
                info!(session_id = %session_id, "WebSocket connection closed by client");
                break;
            }
        }
    }

    // The outbound loop must be gone before the processor is released
    if !sender_task.is_finished() {
        sender_task.abort();
    }
    if let Err(e) = sender_task.await
        && !e.is_cancelled()
    {
        error!(session_id = %session_id, "Result sender task failed: {}", e);
    }

    pipeline.cleanup().await;
    info!(session_id = %session_id, "Transcription session terminated");
}

/// Record the session and start its pipeline
///
/// Nothing is recorded when the pipeline cannot be started.
fn start_session(
    query: &SessionQuery,
    app_state: &AppState,
) -> WebSocketResult<(String, AudioPipeline, mpsc::UnboundedReceiver<ResultMessage>)> {
    let engine = app_state
        .engine
        .as_ref()
        .ok_or(WebSocketError::EngineUnavailable)?;

    let session_id = query.resolve_session_id();
    let (pipeline, results) = AudioPipeline::start(engine, session_id.clone())?;

    app_state.sessions.upsert(
        &session_id,
        query.source_system(),
        query.external_references(),
        query.user_id(),
    );

    Ok((session_id, pipeline, results))
}

/// Process one incoming WebSocket message
///
/// Returns whether the session should keep reading.
async fn process_message(msg: Message, pipeline: &AudioPipeline) -> bool {
    match msg {
        Message::Binary(data) => {
            debug!("Received binary message: {} bytes", data.len());
            if let Err(e) = pipeline.process_audio(data).await {
                debug!(
                    session_id = %pipeline.session_id(),
                    "Dropping audio frame: {}", e
                );
            }
            true
        }
        Message::Text(text) => {
            info!(
                session_id = %pipeline.session_id(),
                "Unexpected text message ({} bytes), ending session",
                text.len()
            );
            false
        }
        Message::Ping(_) => {
            debug!("Received ping message");
            // Ping/Pong is handled automatically by axum
            true
        }
        Message::Pong(_) => {
            debug!("Received pong message");
            true
        }
        Message::Close(_) => {
            info!(session_id = %pipeline.session_id(), "WebSocket connection closed by client");
            false
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &OutgoingMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize outgoing message: {}", e);
            Ok(())
        }
    }
}
