use serde::{Deserialize, Serialize};

/// What the decoder produces from speech.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderTask {
    #[default]
    Transcribe,
    Translate,
}

/// Search strategy used by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderType {
    #[default]
    Greedy,
    Beam,
}

impl DecoderType {
    pub fn for_beam_size(beam_size: usize) -> Self {
        if beam_size > 1 {
            DecoderType::Beam
        } else {
            DecoderType::Greedy
        }
    }
}

/// Parameters handed to a decoder factory when a session starts.
///
/// The commit policy itself lives in the backend; these values only tune it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Minimum audio (seconds) between decode attempts.
    pub segment_length: f64,
    /// Attention frames a token must trail the audio end before it commits.
    pub frame_threshold: u32,
    pub rewind_threshold: u32,
    pub audio_max_len: f64,
    pub audio_min_len: f64,
    pub cif_ckpt_path: Option<String>,
    pub never_fire: bool,
    /// ISO code or `auto` for detection.
    pub language: String,
    pub nonspeech_prob: f32,
    pub decoder_type: DecoderType,
    pub beam_size: usize,
    pub task: DecoderTask,
    pub tokenizer_is_multilingual: bool,
    pub init_prompt: Option<String>,
    pub static_init_prompt: Option<String>,
    pub max_context_tokens: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            segment_length: 1.0,
            frame_threshold: 8,
            rewind_threshold: 200,
            audio_max_len: 30.0,
            audio_min_len: 0.5,
            cif_ckpt_path: None,
            never_fire: false,
            language: "auto".to_string(),
            nonspeech_prob: 0.5,
            decoder_type: DecoderType::Greedy,
            beam_size: 1,
            task: DecoderTask::Transcribe,
            tokenizer_is_multilingual: true,
            init_prompt: None,
            static_init_prompt: None,
            max_context_tokens: None,
        }
    }
}

impl DecoderConfig {
    pub fn is_auto_language(&self) -> bool {
        self.language == "auto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_type_follows_beam_size() {
        assert_eq!(DecoderType::for_beam_size(1), DecoderType::Greedy);
        assert_eq!(DecoderType::for_beam_size(0), DecoderType::Greedy);
        assert_eq!(DecoderType::for_beam_size(5), DecoderType::Beam);
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.frame_threshold, 8);
        assert_eq!(config.audio_max_len, 30.0);
        assert!(config.is_auto_language());
        assert_eq!(serde_json::to_value(config.task).unwrap(), "transcribe");
    }
}
