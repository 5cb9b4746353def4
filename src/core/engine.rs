//! Process-scoped transcription engine.
//!
//! Built once at startup from the server configuration and the registered
//! decoder backends, then shared by reference with every session. It hands
//! out one [`StreamingProcessor`] per session; model weights stay owned by
//! the backend behind the factory.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::core::decoder::{
    Backend, BackendError, BackendPreference, BackendRegistry, DecodeError, DecoderConfig,
    BatchTranscriber, DecoderFactory, DecoderTask, DecoderType, ModelSpec, TokenizerSpec,
};
use crate::core::pipeline::audio::pcm16_bytes_to_f32;
use crate::core::processor::{
    OomPolicy, ProcessorConfig, SilenceDetectorConfig, StreamingProcessor,
};

/// Errors raised while building the engine or a session processor.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid model specification: {0}")]
    InvalidModel(String),
    #[error("Invalid task configuration: {0}")]
    InvalidTask(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Decoder(#[from] DecodeError),
}

/// Everything needed to create session processors.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub model: ModelSpec,
    pub backend: BackendPreference,
    pub disable_fast_encoder: bool,
    pub decoder: DecoderConfig,
    pub processor: ProcessorConfig,
    pub silence: SilenceDetectorConfig,
    pub warmup_file: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        let model = ModelSpec {
            name: config.model_size.clone(),
            path: config.model_path.clone(),
        };
        let task = if config.translate {
            DecoderTask::Translate
        } else {
            DecoderTask::Transcribe
        };

        let decoder = DecoderConfig {
            segment_length: config.min_chunk_size,
            frame_threshold: config.frame_threshold,
            audio_max_len: config.audio_max_len,
            audio_min_len: config.audio_min_len,
            cif_ckpt_path: config.cif_ckpt_path.clone(),
            never_fire: config.never_fire,
            language: config.language.clone(),
            decoder_type: DecoderType::for_beam_size(config.beams),
            beam_size: config.beams,
            task,
            tokenizer_is_multilingual: model.is_multilingual(),
            init_prompt: config.init_prompt.clone(),
            static_init_prompt: config.static_init_prompt.clone(),
            max_context_tokens: config.max_context_tokens,
            ..Default::default()
        };

        let oom_policy = if config.discard_on_oom {
            OomPolicy::DiscardPending
        } else {
            OomPolicy::KeepPending
        };
        let mut processor = ProcessorConfig::default()
            .with_language(config.language.clone())
            .with_silence_threshold_secs(config.silence_threshold_secs)
            .with_oom_policy(oom_policy)
            .with_flush_undetected_language(config.flush_undetected_language)
            .with_release_withheld_on_detection(config.release_withheld_on_detection);
        if config.translate {
            processor = processor.with_tokenizer(TokenizerSpec {
                multilingual: true,
                language: config.language.clone(),
                task: DecoderTask::Translate,
            });
        }

        let silence = SilenceDetectorConfig::default()
            .with_energy_threshold(config.silence_energy_threshold)
            .with_min_silence_ms((config.min_silence_secs * 1000.0).round() as u64);

        Self {
            model,
            backend: config.backend,
            disable_fast_encoder: config.disable_fast_encoder,
            decoder,
            processor,
            silence,
            warmup_file: config.warmup_file.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.model.name.is_none() && self.model.path.is_none() {
            return Err(EngineError::InvalidModel(
                "either a model size or a model path is required".to_string(),
            ));
        }
        if self.decoder.task == DecoderTask::Translate && self.decoder.is_auto_language() {
            return Err(EngineError::InvalidTask(
                "translation requires an explicit source language".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shared entry point for creating per-session processors.
pub struct TranscriptionEngine {
    config: EngineConfig,
    backend: Backend,
    factory: Arc<dyn DecoderFactory>,
    /// Refines finalized segments, when a deployment provides one.
    batch: Option<Arc<dyn BatchTranscriber>>,
}

impl TranscriptionEngine {
    /// Negotiate a backend from `registry` and build the engine around it.
    pub fn new(config: EngineConfig, registry: &BackendRegistry) -> Result<Self, EngineError> {
        config.validate()?;
        let (backend, factory) =
            registry.resolve(config.backend, &config.model, config.disable_fast_encoder)?;
        info!(
            "Using {} backend for model {}",
            backend,
            config.model.display_name()
        );

        let batch = registry.batch_transcriber();
        if batch.is_some() {
            info!("Batch refinement enabled for finalized segments");
        }

        Ok(Self {
            config,
            backend,
            factory,
            batch,
        })
    }

    /// Build the engine around a known factory, skipping negotiation.
    pub fn with_factory(
        config: EngineConfig,
        factory: Arc<dyn DecoderFactory>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            backend: factory.backend(),
            config,
            factory,
            batch: None,
        })
    }

    pub fn with_batch_transcriber(mut self, transcriber: Arc<dyn BatchTranscriber>) -> Self {
        self.batch = Some(transcriber);
        self
    }

    pub fn batch_transcriber(&self) -> Option<Arc<dyn BatchTranscriber>> {
        self.batch.clone()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a processor owning a fresh decoder handle.
    pub fn create_processor(&self) -> Result<StreamingProcessor, EngineError> {
        let decoder = self.factory.create(&self.config.decoder)?;
        Ok(StreamingProcessor::new(
            decoder,
            self.config.processor.clone(),
        ))
    }

    /// Run one decode pass over the configured warmup file.
    ///
    /// Returns whether warmup ran and succeeded. Blocks on file IO and
    /// inference, so async callers should use `spawn_blocking`.
    pub fn warmup(&self) -> bool {
        let Some(path) = &self.config.warmup_file else {
            debug!("No warmup file configured, skipping decoder warmup");
            return false;
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read warmup file {}: {}", path.display(), e);
                return false;
            }
        };
        let audio = pcm16_bytes_to_f32(&bytes);

        let mut processor = match self.create_processor() {
            Ok(processor) => processor,
            Err(e) => {
                warn!("Could not create processor for warmup: {}", e);
                return false;
            }
        };
        processor.warmup(&audio, self.config.decoder.init_prompt.as_deref())
    }
}

impl fmt::Debug for TranscriptionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionEngine")
            .field("backend", &self.backend)
            .field("model", &self.config.model.display_name())
            .field("batch", &self.batch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::audio::f32_to_pcm16_bytes;
    use crate::core::test_support::{ScriptedBatch, ScriptedFactory};
    use std::fs;
    use tempfile::TempDir;

    fn engine_config() -> EngineConfig {
        EngineConfig::from_server_config(&ServerConfig::default())
    }

    #[test]
    fn test_config_mapping() {
        let server = ServerConfig {
            beams: 4,
            model_size: Some("small.en".to_string()),
            language: "en".to_string(),
            min_silence_secs: 0.25,
            discard_on_oom: false,
            release_withheld_on_detection: true,
            max_context_tokens: Some(64),
            ..Default::default()
        };
        let config = EngineConfig::from_server_config(&server);

        assert_eq!(config.decoder.decoder_type, DecoderType::Beam);
        assert_eq!(config.decoder.beam_size, 4);
        assert!(!config.decoder.tokenizer_is_multilingual);
        assert_eq!(config.decoder.max_context_tokens, Some(64));
        assert_eq!(config.processor.language, "en");
        assert_eq!(config.processor.oom_policy, OomPolicy::KeepPending);
        assert!(config.processor.release_withheld_on_detection);
        assert!(config.processor.tokenizer.is_none());
        assert_eq!(config.silence.min_silence_ms, 250);
    }

    #[test]
    fn test_translate_forces_tokenizer() {
        let server = ServerConfig {
            translate: true,
            language: "fr".to_string(),
            ..Default::default()
        };
        let config = EngineConfig::from_server_config(&server);

        assert_eq!(config.decoder.task, DecoderTask::Translate);
        assert_eq!(
            config.processor.tokenizer,
            Some(TokenizerSpec {
                multilingual: true,
                language: "fr".to_string(),
                task: DecoderTask::Translate,
            })
        );
    }

    #[test]
    fn test_validate_rejects_translate_auto() {
        let server = ServerConfig {
            translate: true,
            ..Default::default()
        };
        let config = EngineConfig::from_server_config(&server);

        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidTask(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_model() {
        let mut config = engine_config();
        config.model = ModelSpec {
            name: None,
            path: None,
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_new_without_registered_backend() {
        let result = TranscriptionEngine::new(engine_config(), &BackendRegistry::new());
        assert!(matches!(result, Err(EngineError::Backend(_))));
    }

    #[test]
    fn test_new_resolves_registered_backend() {
        let registry =
            BackendRegistry::new().with_factory(Arc::new(ScriptedFactory::new(Vec::new())));
        let engine = TranscriptionEngine::new(engine_config(), &registry).unwrap();

        assert_eq!(engine.backend(), Backend::Reference);
    }

    #[test]
    fn test_batch_transcriber_comes_from_registry() {
        let factory = Arc::new(ScriptedFactory::new(Vec::new()));
        let plain = TranscriptionEngine::new(
            engine_config(),
            &BackendRegistry::new().with_factory(factory.clone()),
        )
        .unwrap();
        assert!(plain.batch_transcriber().is_none());

        let registry = BackendRegistry::new()
            .with_factory(factory)
            .with_batch_transcriber(Arc::new(ScriptedBatch::default()));
        let engine = TranscriptionEngine::new(engine_config(), &registry).unwrap();
        assert!(engine.batch_transcriber().is_some());
    }

    #[test]
    fn test_create_processor_per_session() {
        let factory = Arc::new(ScriptedFactory::new(Vec::new()));
        let engine = TranscriptionEngine::with_factory(engine_config(), factory.clone()).unwrap();

        let _first = engine.create_processor().unwrap();
        let _second = engine.create_processor().unwrap();

        assert_eq!(factory.logs().len(), 2);
    }

    #[test]
    fn test_warmup_without_file() {
        let factory = Arc::new(ScriptedFactory::new(Vec::new()));
        let engine = TranscriptionEngine::with_factory(engine_config(), factory.clone()).unwrap();

        assert!(!engine.warmup());
        assert!(factory.logs().is_empty());
    }

    #[test]
    fn test_warmup_missing_file_is_not_fatal() {
        let mut config = engine_config();
        config.warmup_file = Some(PathBuf::from("/nonexistent/warmup.pcm"));
        let engine = TranscriptionEngine::with_factory(
            config,
            Arc::new(ScriptedFactory::new(Vec::new())),
        )
        .unwrap();

        assert!(!engine.warmup());
    }

    #[test]
    fn test_warmup_runs_on_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("warmup.pcm");
        fs::write(&path, f32_to_pcm16_bytes(&[0.0; 1600])).unwrap();

        let mut config = engine_config();
        config.warmup_file = Some(path);
        config.decoder.init_prompt = Some("Meeting notes.".to_string());
        let factory = Arc::new(ScriptedFactory::new(Vec::new()));
        let engine = TranscriptionEngine::with_factory(config, factory.clone()).unwrap();

        assert!(engine.warmup());

        let logs = factory.logs();
        let log = logs[0].lock();
        assert_eq!(log.inserted_samples, 1600);
        assert_eq!(log.infer_calls, vec![true]);
        assert_eq!(log.init_prompt.as_deref(), Some("Meeting notes."));
    }
}
