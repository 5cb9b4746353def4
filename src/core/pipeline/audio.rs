//! Inbound audio frame decoding.

/// Convert little-endian PCM16 bytes to f32 samples in `[-1.0, 1.0]`.
///
/// A trailing odd byte is ignored.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

/// Duration in seconds of `samples` at `sample_rate`.
pub fn samples_to_secs(samples: usize, sample_rate: u32) -> f64 {
    samples as f64 / sample_rate as f64
}

/// Encode f32 samples as little-endian PCM16, clamping out-of-range values.
pub fn f32_to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| ((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_conversion() {
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0xC0, 0xFF];
        let samples = pcm16_bytes_to_f32(&bytes);

        assert_eq!(samples, vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_samples_to_secs() {
        assert_eq!(samples_to_secs(16000, 16000), 1.0);
        assert_eq!(samples_to_secs(8000, 16000), 0.5);
    }

    #[test]
    fn test_encode_clamps() {
        let bytes = f32_to_pcm16_bytes(&[2.0, -2.0, 0.0]);
        let samples = pcm16_bytes_to_f32(&bytes);

        assert!(samples[0] > 0.99);
        assert!(samples[1] < -0.99);
        assert_eq!(samples[2], 0.0);
    }
}
