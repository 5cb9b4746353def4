use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///
/// audio:
///   pcm_input: true
///   silence_threshold_secs: 5.0
///   min_silence_secs: 0.5
///   energy_threshold: 0.01
///
/// transcription:
///   model_size: "large-v3"
///   model_path: "/models/custom"
///   language: "auto"
///   backend: "auto"
///   translate: false
///   beams: 1
///   frame_threshold: 8
///   audio_max_len: 30.0
///   audio_min_len: 0.5
///   min_chunk_size: 1.0
///   init_prompt: "Meeting transcript."
///   static_init_prompt: "Glossary: ..."
///   max_context_tokens: 128
///   never_fire: false
///   cif_ckpt_path: "/models/cif.pt"
///   disable_fast_encoder: false
///   warmup_file: "/srv/warmup.pcm"
///
/// recovery:
///   discard_on_oom: true
///   flush_undetected_language: true
///   release_withheld_on_detection: false
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub audio: Option<AudioYaml>,
    pub transcription: Option<TranscriptionYaml>,
    pub recovery: Option<RecoveryYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Audio ingestion and silence handling from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub pcm_input: Option<bool>,
    pub silence_threshold_secs: Option<f64>,
    pub min_silence_secs: Option<f64>,
    pub energy_threshold: Option<f32>,
}

/// Decoder and model settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscriptionYaml {
    pub model_size: Option<String>,
    pub model_path: Option<String>,
    pub language: Option<String>,
    pub backend: Option<String>,
    pub translate: Option<bool>,
    pub beams: Option<usize>,
    pub frame_threshold: Option<u32>,
    pub audio_max_len: Option<f64>,
    pub audio_min_len: Option<f64>,
    pub min_chunk_size: Option<f64>,
    pub init_prompt: Option<String>,
    pub static_init_prompt: Option<String>,
    pub max_context_tokens: Option<usize>,
    pub never_fire: Option<bool>,
    pub cif_ckpt_path: Option<String>,
    pub disable_fast_encoder: Option<bool>,
    pub warmup_file: Option<String>,
}

/// Failure recovery policy from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecoveryYaml {
    pub discard_on_oom: Option<bool>,
    pub flush_undetected_language: Option<bool>,
    pub release_withheld_on_detection: Option<bool>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
