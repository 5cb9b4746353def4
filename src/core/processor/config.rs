use crate::core::decoder::TokenizerSpec;

/// Sample rate every decoder consumes.
pub const SAMPLE_RATE: u32 = 16_000;

/// Silence length at which a gap becomes a hard boundary (seconds).
pub const DEFAULT_SILENCE_THRESHOLD_SECS: f64 = 5.0;

/// What happens to withheld tokens when the decoder runs out of memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OomPolicy {
    /// Drop the pending buffer so the same batch is never replayed.
    #[default]
    DiscardPending,
    /// Keep the pending buffer across the reset.
    KeepPending,
}

/// Tuning for one [`StreamingProcessor`](super::StreamingProcessor).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    pub sample_rate: u32,
    /// Silences at or above this length force a hard boundary.
    pub silence_threshold_secs: f64,
    /// Source language, `auto` enables withholding until detection.
    pub language: String,
    pub oom_policy: OomPolicy,
    /// Release tokens still waiting on language detection at stream end.
    pub flush_undetected_language: bool,
    /// Commit withheld tokens once a later pass reports the language.
    pub release_withheld_on_detection: bool,
    /// Tokenizer forced onto the decoder at construction.
    pub tokenizer: Option<TokenizerSpec>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            silence_threshold_secs: DEFAULT_SILENCE_THRESHOLD_SECS,
            language: "auto".to_string(),
            oom_policy: OomPolicy::DiscardPending,
            flush_undetected_language: true,
            release_withheld_on_detection: false,
            tokenizer: None,
        }
    }
}

impl ProcessorConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_silence_threshold_secs(mut self, secs: f64) -> Self {
        self.silence_threshold_secs = secs;
        self
    }

    pub fn with_oom_policy(mut self, policy: OomPolicy) -> Self {
        self.oom_policy = policy;
        self
    }

    pub fn with_flush_undetected_language(mut self, flush: bool) -> Self {
        self.flush_undetected_language = flush;
        self
    }

    pub fn with_release_withheld_on_detection(mut self, release: bool) -> Self {
        self.release_withheld_on_detection = release;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerSpec) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn is_auto_language(&self) -> bool {
        self.language == "auto"
    }
}
