//! Chunk-level silence detection on incoming audio.
//!
//! # State Transitions
//!
//! ```text
//! [Speech] ─── rms <= threshold ──► [Quiet] (audio still decoded)
//!    ▲                                 │
//!    │                  quiet >= min_silence_ms
//!    │                                 ▼
//!    └──── rms > threshold ──── [Silence] (audio withheld, SilenceEnded)
//! ```
//!
//! Quiet chunks shorter than `min_silence_ms` in total are treated as pauses
//! inside speech and still reach the decoder.

use tracing::debug;

use crate::core::timed::Silence;

/// Outcome of classifying one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum SilenceEvent {
    /// The chunk carries speech.
    Speech,
    /// Below threshold, but not long enough to count as silence yet.
    Quiet,
    /// This chunk confirmed a silence starting at its own start.
    SilenceStarted(Silence),
    /// Ongoing silence, extended through this chunk.
    SilenceContinues(Silence),
    /// Speech resumed; the closed silence ends where this chunk starts.
    SilenceEnded(Silence),
}

impl SilenceEvent {
    /// Whether the chunk that produced this event should reach the decoder.
    pub fn forwards_audio(&self) -> bool {
        matches!(
            self,
            SilenceEvent::Speech | SilenceEvent::Quiet | SilenceEvent::SilenceEnded(_)
        )
    }
}

/// Configuration for [`SilenceDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceDetectorConfig {
    /// RMS amplitude at or below which a chunk counts as quiet.
    ///
    /// Default: 0.01 (about -40 dBFS).
    pub energy_threshold: f32,

    /// Continuous quiet needed before a silence is declared (ms).
    ///
    /// Default: 500ms.
    pub min_silence_ms: u64,
}

impl Default for SilenceDetectorConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            min_silence_ms: 500,
        }
    }
}

impl SilenceDetectorConfig {
    pub fn with_energy_threshold(mut self, threshold: f32) -> Self {
        self.energy_threshold = threshold;
        self
    }

    pub fn with_min_silence_ms(mut self, ms: u64) -> Self {
        self.min_silence_ms = ms;
        self
    }
}

/// Tracks silence across a session's audio chunks.
///
/// Owned by the session worker, so plain fields suffice.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    config: SilenceDetectorConfig,
    quiet_secs: f64,
    current: Option<Silence>,
}

impl SilenceDetector {
    pub fn new(config: SilenceDetectorConfig) -> Self {
        Self {
            config,
            quiet_secs: 0.0,
            current: None,
        }
    }

    pub fn in_silence(&self) -> bool {
        self.current.is_some()
    }

    /// Classify the chunk covering `[chunk_start, chunk_end)`.
    pub fn observe(&mut self, samples: &[f32], chunk_start: f64, chunk_end: f64) -> SilenceEvent {
        let is_speech = rms(samples) > self.config.energy_threshold;

        if is_speech {
            self.quiet_secs = 0.0;
            return match self.current.take() {
                Some(mut silence) => {
                    silence.close_at(chunk_start);
                    debug!(
                        "Speech resumed at {:.2}s after {:.2}s of silence",
                        chunk_start,
                        silence.duration.unwrap_or_default()
                    );
                    SilenceEvent::SilenceEnded(silence)
                }
                None => SilenceEvent::Speech,
            };
        }

        if let Some(silence) = self.current.as_mut() {
            silence.extend_to(chunk_end);
            return SilenceEvent::SilenceContinues(silence.clone());
        }

        self.quiet_secs += chunk_end - chunk_start;
        if self.quiet_secs * 1000.0 >= self.config.min_silence_ms as f64 {
            let mut silence = Silence::starting_at(chunk_start);
            silence.extend_to(chunk_end);
            debug!("Silence detected from {:.2}s", chunk_start);
            self.current = Some(silence.clone());
            SilenceEvent::SilenceStarted(silence)
        } else {
            SilenceEvent::Quiet
        }
    }

    /// Close an ongoing silence at `at`, e.g. when the stream ends.
    pub fn flush(&mut self, at: f64) -> Option<Silence> {
        self.quiet_secs = 0.0;
        self.current.take().map(|mut silence| {
            silence.close_at(at);
            silence
        })
    }

    pub fn reset(&mut self) {
        self.quiet_secs = 0.0;
        self.current = None;
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
