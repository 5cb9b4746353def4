//! Batch refinement of finalized segments.

use std::sync::Arc;

use tracing::{debug, error};

use crate::core::decoder::BatchTranscriber;
use crate::core::timed::Segment;

use super::audio::samples_to_secs;

/// Longest stretch of received audio kept for refinement.
const MAX_HISTORY_SECS: f64 = 120.0;

/// Keeps the session's received audio so FINAL segments can be
/// re-transcribed by a [`BatchTranscriber`].
pub(super) struct BatchRefiner {
    transcriber: Arc<dyn BatchTranscriber>,
    sample_rate: u32,
    samples: Vec<f32>,
    /// Session time of `samples[0]`.
    origin_secs: f64,
}

impl BatchRefiner {
    pub(super) fn new(transcriber: Arc<dyn BatchTranscriber>, sample_rate: u32) -> Self {
        Self {
            transcriber,
            sample_rate,
            samples: Vec::new(),
            origin_secs: 0.0,
        }
    }

    /// Append a received chunk, silence included, so indices track session time.
    pub(super) fn record(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);

        let max_len = (MAX_HISTORY_SECS * self.sample_rate as f64) as usize;
        if self.samples.len() > max_len {
            self.discard(self.samples.len() - max_len);
        }
    }

    /// Batch text for `segment`, or `None` when its audio is gone or the
    /// transcriber fails or returns nothing.
    pub(super) fn refine(&mut self, segment: &Segment) -> Option<String> {
        let (Some(start), Some(end)) = (segment.start, segment.end) else {
            return None;
        };
        let from = self.index_of(start);
        let to = self.index_of(end);
        if to <= from {
            debug!("No audio left for segment {}, skipping batch pass", segment.id);
            return None;
        }

        let result = self.transcriber.transcribe_text(&self.samples[from..to]);
        // Later segments start after this one ends
        self.discard(to);

        match result {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                error!("Batch transcription failed for segment {}: {}", segment.id, e);
                None
            }
        }
    }

    fn index_of(&self, secs: f64) -> usize {
        let offset = ((secs - self.origin_secs).max(0.0) * self.sample_rate as f64).round();
        (offset as usize).min(self.samples.len())
    }

    fn discard(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
        self.origin_secs += samples_to_secs(count, self.sample_rate);
    }
}
