//! Decoder backend negotiation.
//!
//! Selecting a backend is a pure function of what was requested, what the
//! process can run, and what the configured model can be loaded by. Probing
//! for capabilities happens once, from the factories registered at startup.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::base::{BatchTranscriber, DecoderFactory, ModelSpec};

/// Inference engine that runs the acoustic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Platform-native accelerated engine.
    Native,
    /// Optimized cross-platform engine.
    Fast,
    /// Reference implementation, always the fallback.
    Reference,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => write!(f, "native"),
            Backend::Fast => write!(f, "fast"),
            Backend::Reference => write!(f, "reference"),
        }
    }
}

/// Backend requested through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendPreference {
    #[default]
    Auto,
    Native,
    Fast,
    Reference,
}

impl FromStr for BackendPreference {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(BackendPreference::Auto),
            "native" | "mlx-whisper" | "mlx" => Ok(BackendPreference::Native),
            "fast" | "faster-whisper" => Ok(BackendPreference::Fast),
            "reference" | "whisper" => Ok(BackendPreference::Reference),
            "openai-api" => Err(BackendError::Unsupported(
                "openai-api cannot drive a streaming decoder".to_string(),
            )),
            _ => Err(BackendError::Unsupported(format!(
                "Unknown backend: {s}. Supported backends: auto, native, fast, reference"
            ))),
        }
    }
}

/// What the running process can execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub native_available: bool,
    pub fast_available: bool,
    /// The platform favours the native engine when it can be used.
    pub prefers_native: bool,
}

/// Whether the configured model can be loaded by each accelerated engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCompatibility {
    pub native: bool,
    pub fast: bool,
}

impl Default for ModelCompatibility {
    fn default() -> Self {
        Self {
            native: true,
            fast: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0} backend requested but it is unavailable or incompatible with the configured model")]
    Unavailable(Backend),
    #[error("Unsupported backend: {0}")]
    Unsupported(String),
    #[error("No decoder factory registered for the {0} backend")]
    NotRegistered(Backend),
}

/// Choose the backend for this process.
///
/// `disable_fast` forces the reference engine regardless of the request.
pub fn select_backend(
    preference: BackendPreference,
    capabilities: Capabilities,
    compatibility: ModelCompatibility,
    disable_fast: bool,
) -> Result<Backend, BackendError> {
    let can_use_native = capabilities.native_available && compatibility.native;
    let can_use_fast = capabilities.fast_available && compatibility.fast;

    if disable_fast {
        return Ok(Backend::Reference);
    }

    match preference {
        BackendPreference::Reference => Ok(Backend::Reference),
        BackendPreference::Native if can_use_native => Ok(Backend::Native),
        BackendPreference::Native => Err(BackendError::Unavailable(Backend::Native)),
        BackendPreference::Fast if can_use_fast => Ok(Backend::Fast),
        BackendPreference::Fast => Err(BackendError::Unavailable(Backend::Fast)),
        BackendPreference::Auto => {
            if capabilities.prefers_native && can_use_native {
                Ok(Backend::Native)
            } else if can_use_fast {
                Ok(Backend::Fast)
            } else {
                Ok(Backend::Reference)
            }
        }
    }
}

/// Decoder factories linked into this process, keyed by backend.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<Backend, Arc<dyn DecoderFactory>>,
    batch: Option<Arc<dyn BatchTranscriber>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under the backend it reports.
    pub fn register(&mut self, factory: Arc<dyn DecoderFactory>) -> &mut Self {
        self.factories.insert(factory.backend(), factory);
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn DecoderFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Attach the transcriber used to refine finalized segments.
    pub fn with_batch_transcriber(mut self, transcriber: Arc<dyn BatchTranscriber>) -> Self {
        self.batch = Some(transcriber);
        self
    }

    pub fn batch_transcriber(&self) -> Option<Arc<dyn BatchTranscriber>> {
        self.batch.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn get(&self, backend: Backend) -> Option<Arc<dyn DecoderFactory>> {
        self.factories.get(&backend).cloned()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_available: self.factories.contains_key(&Backend::Native),
            fast_available: self.factories.contains_key(&Backend::Fast),
            prefers_native: cfg!(target_os = "macos"),
        }
    }

    pub fn compatibility(&self, model: &ModelSpec) -> ModelCompatibility {
        let supports = |backend| {
            self.factories
                .get(&backend)
                .is_some_and(|factory| factory.supports_model(model))
        };
        ModelCompatibility {
            native: supports(Backend::Native),
            fast: supports(Backend::Fast),
        }
    }

    /// Negotiate a backend and return its factory.
    pub fn resolve(
        &self,
        preference: BackendPreference,
        model: &ModelSpec,
        disable_fast: bool,
    ) -> Result<(Backend, Arc<dyn DecoderFactory>), BackendError> {
        let backend = select_backend(
            preference,
            self.capabilities(),
            self.compatibility(model),
            disable_fast,
        )?;
        let factory = self.get(backend).ok_or(BackendError::NotRegistered(backend))?;
        Ok((backend, factory))
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.factories.keys().collect::<Vec<_>>())
            .field("batch", &self.batch.is_some())
            .finish()
    }
}
