use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::decoder::BackendRegistry;
use crate::core::engine::{EngineConfig, TranscriptionEngine};

mod sessions;

pub use sessions::{SessionMetadata, SessionRegistry};

/// Application state that can be shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Every session seen since startup
    pub sessions: Arc<SessionRegistry>,
    /// Shared transcription engine, absent when no decoder backend could be
    /// negotiated. Sessions are refused while it is missing.
    pub engine: Option<Arc<TranscriptionEngine>>,
}

impl AppState {
    /// Build the application state, negotiating a backend from `backends`
    /// and warming the decoder up when a warmup file is configured.
    pub async fn new(config: ServerConfig, backends: BackendRegistry) -> Arc<Self> {
        let engine_config = EngineConfig::from_server_config(&config);
        let engine = match TranscriptionEngine::new(engine_config, &backends) {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!("Transcription engine unavailable, sessions will be refused: {}", e);
                None
            }
        };

        if let Some(engine) = &engine {
            let engine = engine.clone();
            match tokio::task::spawn_blocking(move || engine.warmup()).await {
                Ok(true) => info!("Decoder warmup complete"),
                Ok(false) => {}
                Err(e) => warn!("Decoder warmup task failed: {}", e),
            }
        }

        Self::with_engine(config, engine)
    }

    /// Build the application state around an already constructed engine.
    pub fn with_engine(config: ServerConfig, engine: Option<Arc<TranscriptionEngine>>) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            engine,
        })
    }

    /// Name of the negotiated backend, if any.
    pub fn backend_name(&self) -> Option<String> {
        self.engine.as_ref().map(|engine| engine.backend().to_string())
    }
}
