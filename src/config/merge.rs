use std::env;
use std::path::PathBuf;

use super::ServerConfig;
use super::utils::{non_empty, parse_bool, parse_number};
use super::yaml::YamlConfig;
use crate::core::decoder::BackendPreference;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration to use as overrides
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = ServerConfig::default();

    let server = yaml.server.unwrap_or_default();
    let audio = yaml.audio.unwrap_or_default();
    let transcription = yaml.transcription.unwrap_or_default();
    let recovery = yaml.recovery.unwrap_or_default();

    // Optional string: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            non_empty($yaml_value.or_else(|| env::var($env_var).ok()))
        };
    }

    // Parsed value: YAML > ENV > default
    macro_rules! get_parsed {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => match env::var($env_var) {
                    Ok(raw) => parse_number(&$env_var, &raw)?,
                    Err(_) => $default,
                },
            }
        };
    }

    // Boolean value: YAML > ENV > default
    macro_rules! get_bool {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => match env::var($env_var) {
                    Ok(raw) => parse_bool(&raw)
                        .ok_or_else(|| format!("Invalid {} value '{}'", $env_var, raw))?,
                    Err(_) => $default,
                },
            }
        };
    }

    // Server
    let host = get_optional!("HOST", server.host).unwrap_or(defaults.host);
    let port = get_parsed!("PORT", server.port, defaults.port);

    // Audio
    let pcm_input = get_bool!("PCM_INPUT", audio.pcm_input, defaults.pcm_input);
    let silence_threshold_secs = get_parsed!(
        "SILENCE_THRESHOLD_SECS",
        audio.silence_threshold_secs,
        defaults.silence_threshold_secs
    );
    let min_silence_secs = get_parsed!(
        "MIN_SILENCE_SECS",
        audio.min_silence_secs,
        defaults.min_silence_secs
    );
    let silence_energy_threshold = get_parsed!(
        "SILENCE_ENERGY_THRESHOLD",
        audio.energy_threshold,
        defaults.silence_energy_threshold
    );

    // Transcription
    let model_size = get_optional!("MODEL_SIZE", transcription.model_size);
    let model_path = get_optional!("MODEL_PATH", transcription.model_path).map(PathBuf::from);
    // Only fall back to the default model when no custom path was given
    let model_size = match (&model_size, &model_path) {
        (None, None) => defaults.model_size,
        _ => model_size,
    };
    let language =
        get_optional!("LANGUAGE", transcription.language).unwrap_or(defaults.language);
    let backend = match get_optional!("BACKEND", transcription.backend) {
        Some(name) => name.parse::<BackendPreference>()?,
        None => defaults.backend,
    };
    let translate = get_bool!("TRANSLATE", transcription.translate, defaults.translate);
    let beams = get_parsed!("BEAMS", transcription.beams, defaults.beams);
    let frame_threshold = get_parsed!(
        "FRAME_THRESHOLD",
        transcription.frame_threshold,
        defaults.frame_threshold
    );
    let audio_max_len = get_parsed!(
        "AUDIO_MAX_LEN",
        transcription.audio_max_len,
        defaults.audio_max_len
    );
    let audio_min_len = get_parsed!(
        "AUDIO_MIN_LEN",
        transcription.audio_min_len,
        defaults.audio_min_len
    );
    let min_chunk_size = get_parsed!(
        "MIN_CHUNK_SIZE",
        transcription.min_chunk_size,
        defaults.min_chunk_size
    );
    let init_prompt = get_optional!("INIT_PROMPT", transcription.init_prompt);
    let static_init_prompt = get_optional!("STATIC_INIT_PROMPT", transcription.static_init_prompt);
    let max_context_tokens = match transcription.max_context_tokens {
        Some(tokens) => Some(tokens),
        None => get_optional!("MAX_CONTEXT_TOKENS", None::<String>)
            .map(|raw| parse_number::<usize>("MAX_CONTEXT_TOKENS", &raw))
            .transpose()?,
    };
    let never_fire = get_bool!("NEVER_FIRE", transcription.never_fire, defaults.never_fire);
    let cif_ckpt_path = get_optional!("CIF_CKPT_PATH", transcription.cif_ckpt_path);
    let disable_fast_encoder = get_bool!(
        "DISABLE_FAST_ENCODER",
        transcription.disable_fast_encoder,
        defaults.disable_fast_encoder
    );
    let warmup_file = get_optional!("WARMUP_FILE", transcription.warmup_file).map(PathBuf::from);

    // Recovery
    let discard_on_oom = get_bool!(
        "DISCARD_ON_OOM",
        recovery.discard_on_oom,
        defaults.discard_on_oom
    );
    let flush_undetected_language = get_bool!(
        "FLUSH_UNDETECTED_LANGUAGE",
        recovery.flush_undetected_language,
        defaults.flush_undetected_language
    );
    let release_withheld_on_detection = get_bool!(
        "RELEASE_WITHHELD_ON_DETECTION",
        recovery.release_withheld_on_detection,
        defaults.release_withheld_on_detection
    );

    Ok(ServerConfig {
        host,
        port,
        pcm_input,
        silence_threshold_secs,
        min_silence_secs,
        silence_energy_threshold,
        model_size,
        model_path,
        language,
        backend,
        translate,
        beams,
        frame_threshold,
        audio_max_len,
        audio_min_len,
        min_chunk_size,
        init_prompt,
        static_init_prompt,
        max_context_tokens,
        never_fire,
        cif_ckpt_path,
        disable_fast_encoder,
        warmup_file,
        discard_on_oom,
        flush_undetected_language,
        release_withheld_on_detection,
    })
}

#[cfg(test)]
mod tests {
    use super::super::yaml::{AudioYaml, RecoveryYaml, ServerYaml, TranscriptionYaml};
    use super::*;
    use serial_test::serial;

    pub(crate) fn cleanup_env_vars() {
        unsafe {
            for var in [
                "HOST",
                "PORT",
                "PCM_INPUT",
                "SILENCE_THRESHOLD_SECS",
                "MIN_SILENCE_SECS",
                "SILENCE_ENERGY_THRESHOLD",
                "MODEL_SIZE",
                "MODEL_PATH",
                "LANGUAGE",
                "BACKEND",
                "TRANSLATE",
                "BEAMS",
                "FRAME_THRESHOLD",
                "AUDIO_MAX_LEN",
                "AUDIO_MIN_LEN",
                "MIN_CHUNK_SIZE",
                "INIT_PROMPT",
                "STATIC_INIT_PROMPT",
                "MAX_CONTEXT_TOKENS",
                "NEVER_FIRE",
                "CIF_CKPT_PATH",
                "DISABLE_FAST_ENCODER",
                "WARMUP_FILE",
                "DISCARD_ON_OOM",
                "FLUSH_UNDETECTED_LANGUAGE",
                "RELEASE_WITHHELD_ON_DETECTION",
            ] {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_merge_defaults_when_no_yaml_or_env() {
        cleanup_env_vars();

        let config = merge_config(None).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.pcm_input);
        assert_eq!(config.silence_threshold_secs, 5.0);
        assert_eq!(config.model_size.as_deref(), Some("base"));
        assert_eq!(config.language, "auto");
        assert_eq!(config.backend, BackendPreference::Auto);
        assert_eq!(config.beams, 1);
        assert!(config.discard_on_oom);
        assert!(config.flush_undetected_language);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_yaml_only() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                port: Some(8080),
            }),
            audio: Some(AudioYaml {
                silence_threshold_secs: Some(3.0),
                ..Default::default()
            }),
            transcription: Some(TranscriptionYaml {
                language: Some("nl".to_string()),
                backend: Some("whisper".to_string()),
                max_context_tokens: Some(32),
                ..Default::default()
            }),
            recovery: Some(RecoveryYaml {
                discard_on_oom: Some(false),
                ..Default::default()
            }),
        };

        let config = merge_config(Some(yaml)).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.silence_threshold_secs, 3.0);
        assert_eq!(config.language, "nl");
        assert_eq!(config.backend, BackendPreference::Reference);
        assert_eq!(config.max_context_tokens, Some(32));
        assert!(!config.discard_on_oom);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_yaml_overrides_env() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                port: Some(8080),
            }),
            ..Default::default()
        };

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "9000");
            env::set_var("LANGUAGE", "de");
        }

        let config = merge_config(Some(yaml)).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        // ENV fills in what YAML leaves out
        assert_eq!(config.language, "de");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_env_values() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PCM_INPUT", "no");
            env::set_var("BEAMS", "5");
            env::set_var("MAX_CONTEXT_TOKENS", "96");
            env::set_var("MODEL_PATH", "/models/custom");
            env::set_var("FLUSH_UNDETECTED_LANGUAGE", "0");
            env::set_var("RELEASE_WITHHELD_ON_DETECTION", "yes");
        }

        let config = merge_config(None).unwrap();

        assert!(!config.pcm_input);
        assert_eq!(config.beams, 5);
        assert_eq!(config.max_context_tokens, Some(96));
        assert_eq!(config.model_path, Some(PathBuf::from("/models/custom")));
        assert_eq!(config.model_size, None);
        assert!(!config.flush_undetected_language);
        assert!(config.release_withheld_on_detection);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_rejects_malformed_env() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "not-a-port");
        }
        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
        unsafe {
            env::set_var("NEVER_FIRE", "sometimes");
        }
        assert!(merge_config(None).is_err());

        cleanup_env_vars();
        unsafe {
            env::set_var("BACKEND", "openai-api");
        }
        assert!(merge_config(None).is_err());

        cleanup_env_vars();
    }
}
