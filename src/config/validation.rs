use std::path::PathBuf;

/// Validate model selection
///
/// Either a model size or a custom model path must be configured.
pub fn validate_model(
    model_size: &Option<String>,
    model_path: &Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if model_size.is_none() && model_path.is_none() {
        return Err("Either MODEL_SIZE or MODEL_PATH must be configured".into());
    }
    Ok(())
}

/// Validate the translation task
///
/// Translation needs a known source language, so it cannot be combined with
/// automatic language detection.
pub fn validate_translation(
    translate: bool,
    language: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if translate && language.eq_ignore_ascii_case("auto") {
        return Err("TRANSLATE=true requires an explicit LANGUAGE, not 'auto'".into());
    }
    Ok(())
}

/// Validate silence handling thresholds
pub fn validate_silence(
    silence_threshold_secs: f64,
    min_silence_secs: f64,
    energy_threshold: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    if silence_threshold_secs.is_nan() || silence_threshold_secs <= 0.0 {
        return Err(format!(
            "SILENCE_THRESHOLD_SECS must be greater than 0, got {silence_threshold_secs}"
        )
        .into());
    }
    if min_silence_secs < 0.0 {
        return Err(format!("MIN_SILENCE_SECS cannot be negative, got {min_silence_secs}").into());
    }
    if energy_threshold < 0.0 {
        return Err(format!(
            "SILENCE_ENERGY_THRESHOLD cannot be negative, got {energy_threshold}"
        )
        .into());
    }
    Ok(())
}

/// Validate decoder window and search settings
pub fn validate_decoder(
    beams: usize,
    audio_min_len: f64,
    audio_max_len: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    if beams == 0 {
        return Err("BEAMS must be at least 1".into());
    }
    if audio_min_len > audio_max_len {
        return Err(format!(
            "AUDIO_MIN_LEN ({audio_min_len}) cannot exceed AUDIO_MAX_LEN ({audio_max_len})"
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_model() {
        assert!(validate_model(&Some("base".to_string()), &None).is_ok());
        assert!(validate_model(&None, &Some(PathBuf::from("/models/x"))).is_ok());

        let err = validate_model(&None, &None).unwrap_err();
        assert!(err.to_string().contains("MODEL_SIZE"));
    }

    #[test]
    fn test_validate_translation() {
        assert!(validate_translation(false, "auto").is_ok());
        assert!(validate_translation(true, "fr").is_ok());
        assert!(validate_translation(true, "auto").is_err());
        assert!(validate_translation(true, "AUTO").is_err());
    }

    #[test]
    fn test_validate_silence() {
        assert!(validate_silence(5.0, 0.5, 0.01).is_ok());
        assert!(validate_silence(0.0, 0.5, 0.01).is_err());
        assert!(validate_silence(f64::NAN, 0.5, 0.01).is_err());
        assert!(validate_silence(5.0, -1.0, 0.01).is_err());
        assert!(validate_silence(5.0, 0.5, -0.1).is_err());
    }

    #[test]
    fn test_validate_decoder() {
        assert!(validate_decoder(1, 0.5, 30.0).is_ok());
        assert!(validate_decoder(0, 0.5, 30.0).is_err());

        let err = validate_decoder(1, 40.0, 30.0).unwrap_err();
        assert!(err.to_string().contains("AUDIO_MIN_LEN"));
    }
}
