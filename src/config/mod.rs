//! Configuration module for the livescribe server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. YAML values take precedence over environment variables,
//! which take precedence over built-in defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use livescribe::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use crate::core::decoder::BackendPreference;
use crate::core::processor::DEFAULT_SILENCE_THRESHOLD_SECS;

mod env;
mod merge;
pub(crate) mod utils;
mod validation;
mod yaml;

/// Server configuration
///
/// Contains all configuration needed to run the transcription server:
/// - Server settings (host, port)
/// - Audio ingestion and silence handling
/// - Model, backend and decoder tuning
/// - Failure recovery policy
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Audio settings
    /// Clients send raw little-endian PCM16 mono frames at 16 kHz.
    pub pcm_input: bool,
    pub silence_threshold_secs: f64,
    pub min_silence_secs: f64,
    pub silence_energy_threshold: f32,

    // Model and backend
    pub model_size: Option<String>,
    pub model_path: Option<PathBuf>,
    pub language: String,
    pub backend: BackendPreference,
    pub translate: bool,

    // Decoder tuning
    pub beams: usize,
    pub frame_threshold: u32,
    pub audio_max_len: f64,
    pub audio_min_len: f64,
    pub min_chunk_size: f64,
    pub init_prompt: Option<String>,
    pub static_init_prompt: Option<String>,
    pub max_context_tokens: Option<usize>,
    pub never_fire: bool,
    pub cif_ckpt_path: Option<String>,
    pub disable_fast_encoder: bool,
    pub warmup_file: Option<PathBuf>,

    // Recovery policy
    pub discard_on_oom: bool,
    pub flush_undetected_language: bool,
    pub release_withheld_on_detection: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            pcm_input: true,
            silence_threshold_secs: DEFAULT_SILENCE_THRESHOLD_SECS,
            min_silence_secs: 0.5,
            silence_energy_threshold: 0.01,
            model_size: Some("base".to_string()),
            model_path: None,
            language: "auto".to_string(),
            backend: BackendPreference::Auto,
            translate: false,
            beams: 1,
            frame_threshold: 8,
            audio_max_len: 30.0,
            audio_min_len: 0.5,
            min_chunk_size: 1.0,
            init_prompt: None,
            static_init_prompt: None,
            max_context_tokens: None,
            never_fire: false,
            cif_ckpt_path: None,
            disable_fast_encoder: false,
            warmup_file: None,
            discard_on_oom: true,
            flush_undetected_language: true,
            release_withheld_on_detection: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable fallbacks
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // The .env file is not loaded here: the YAML file is the source of truth
        // and only real environment variables fill in what it leaves out.
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_model(&self.model_size, &self.model_path)?;
        validation::validate_translation(self.translate, &self.language)?;
        validation::validate_silence(
            self.silence_threshold_secs,
            self.min_silence_secs,
            self.silence_energy_threshold,
        )?;
        validation::validate_decoder(self.beams, self.audio_min_len, self.audio_max_len)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Human readable model name for logs and health checks
    pub fn model_name(&self) -> String {
        match (&self.model_path, &self.model_size) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(size)) => size.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}
