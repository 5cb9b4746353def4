use crate::core::timed::Token;

use super::backend::Backend;
use super::config::{DecoderConfig, DecoderTask};

/// Errors reported by a streaming decoder.
///
/// Out-of-memory conditions get their own variant so callers can recover
/// without inspecting messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Accelerator out of memory: {0}")]
    OutOfMemory(String),
    #[error("Decoder failure: {0}")]
    Backend(String),
    #[error("Decoder unavailable: {0}")]
    Unavailable(String),
}

impl DecodeError {
    /// Classify a raw failure message coming out of a native backend.
    ///
    /// Backends whose runtimes only surface errors as text use this at their
    /// boundary; everything past it matches on the variant.
    pub fn from_backend_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("out of memory") || lower.contains("outofmemory") {
            DecodeError::OutOfMemory(message)
        } else {
            DecodeError::Backend(message)
        }
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, DecodeError::OutOfMemory(_))
    }
}

/// Tokenizer selection a processor can impose on its decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerSpec {
    pub multilingual: bool,
    pub language: String,
    pub task: DecoderTask,
}

/// Model identity handed to factories so they can report compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Named model size such as `base` or `large-v3`.
    pub name: Option<String>,
    /// Custom checkpoint location; takes precedence over `name`.
    pub path: Option<std::path::PathBuf>,
}

impl ModelSpec {
    pub fn has_custom_path(&self) -> bool {
        self.path.is_some()
    }

    /// English-only checkpoints are conventionally suffixed `.en`.
    pub fn is_multilingual(&self) -> bool {
        !self
            .name
            .as_deref()
            .is_some_and(|name| name.ends_with(".en"))
    }

    pub fn display_name(&self) -> String {
        match (&self.path, &self.name) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// One session's handle on the external streaming decoder.
///
/// A handle is owned by exactly one processor; implementations may share
/// read-only model weights behind it.
pub trait StreamingDecoder: Send {
    /// Append 16 kHz mono samples to the decoder's input buffer.
    fn insert_audio(&mut self, samples: &[f32]);

    /// Attempt a commit decision over the buffered audio.
    ///
    /// Returns the newly committed tokens, possibly none.
    fn infer(&mut self, is_last: bool) -> Result<Vec<Token>, DecodeError>;

    /// Flush internal segment state. `complete` marks a hard boundary.
    fn refresh_segment(&mut self, complete: bool) -> Result<(), DecodeError>;

    fn global_time_offset(&self) -> f64;

    fn set_global_time_offset(&mut self, offset: f64);

    fn speaker(&self) -> i32;

    fn set_speaker(&mut self, speaker: i32);

    fn set_tokenizer(&mut self, tokenizer: TokenizerSpec);

    /// Release cached accelerator memory, if the backend keeps any.
    fn release_memory(&mut self) {}

    /// Prime the decoder context with a prompt before the first pass.
    fn set_init_prompt(&mut self, _prompt: &str) {}
}

/// Produces decoder handles for one backend.
pub trait DecoderFactory: Send + Sync {
    fn backend(&self) -> Backend;

    /// Whether this backend can load `model`.
    fn supports_model(&self, _model: &ModelSpec) -> bool {
        true
    }

    fn create(&self, config: &DecoderConfig) -> Result<Box<dyn StreamingDecoder>, DecodeError>;
}

/// Offline transcription of a finished stretch of audio.
///
/// Produces the batch-refined text of a segment once it is FINAL. One
/// instance serves every session, so implementations synchronize internally.
pub trait BatchTranscriber: Send + Sync {
    /// Transcribe 16 kHz mono samples into plain text.
    fn transcribe_text(&self, audio: &[f32]) -> Result<String, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_out_of_memory_messages() {
        let err = DecodeError::from_backend_message("CUDA out of memory. Tried to allocate 2 GiB");
        assert!(err.is_out_of_memory());

        let err = DecodeError::from_backend_message("RuntimeError: OutOfMemory on device");
        assert!(err.is_out_of_memory());

        let err = DecodeError::from_backend_message("shape mismatch");
        assert_eq!(err, DecodeError::Backend("shape mismatch".to_string()));
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn test_model_spec_multilingual() {
        let english = ModelSpec {
            name: Some("base.en".to_string()),
            path: None,
        };
        let multi = ModelSpec {
            name: Some("large-v3".to_string()),
            path: None,
        };

        assert!(!english.is_multilingual());
        assert!(multi.is_multilingual());
        assert_eq!(multi.display_name(), "large-v3");
    }
}
