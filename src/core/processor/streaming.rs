use tracing::{debug, error, info, warn};

use crate::core::decoder::{DecodeError, StreamingDecoder};
use crate::core::timed::{ChangeSpeaker, Token, Transcript};

use super::config::{OomPolicy, ProcessorConfig};
use super::state::SessionState;

/// Result of one decode attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationOutcome {
    /// Newly committed tokens, empty when nothing stabilized.
    pub tokens: Vec<Token>,
    /// Audio-time cursor at the moment of the attempt.
    pub processed_upto: f64,
}

/// How a silence was folded into the decoder's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceBoundary {
    /// Injected as zero samples; decoder context kept.
    Soft,
    /// Decoder state flushed and its time origin moved past the gap.
    Hard,
}

/// Drives one session's decoder handle and accumulates its output.
///
/// Decoder failures never escape: out-of-memory errors reset the decoder,
/// anything else is logged and treated as an empty iteration.
pub struct StreamingProcessor {
    decoder: Box<dyn StreamingDecoder>,
    config: ProcessorConfig,
    state: SessionState,
}

impl StreamingProcessor {
    pub fn new(mut decoder: Box<dyn StreamingDecoder>, config: ProcessorConfig) -> Self {
        if let Some(tokenizer) = &config.tokenizer {
            debug!(
                "Forcing {:?} tokenizer for language {}",
                tokenizer.task, tokenizer.language
            );
            decoder.set_tokenizer(tokenizer.clone());
        }

        Self {
            decoder,
            config,
            state: SessionState::default(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn committed(&self) -> &[Token] {
        &self.state.committed
    }

    pub fn end(&self) -> f64 {
        self.state.end
    }

    /// Withheld tokens, concatenated without a separator.
    pub fn buffer_preview(&self) -> Transcript {
        Transcript::from_tokens(&self.state.buffer, "", 0.0)
    }

    /// Append audio and move the cursor to `stream_end_time`.
    pub fn insert_audio(&mut self, chunk: &[f32], stream_end_time: f64) {
        self.state.end = stream_end_time;
        self.decoder.insert_audio(chunk);
    }

    /// Ask the decoder for a commit decision.
    pub fn process_iteration(&mut self, is_last: bool) -> IterationOutcome {
        let tokens = match self.decoder.infer(is_last) {
            Ok(tokens) => self.accept(tokens),
            Err(err) => {
                self.recover(err, is_last);
                Vec::new()
            }
        };
        self.state.update_remaining(is_last);

        IterationOutcome {
            tokens,
            processed_upto: self.state.end,
        }
    }

    /// Final pass when a silence begins.
    pub fn start_silence(&mut self) -> IterationOutcome {
        self.process_iteration(true)
    }

    /// Fold a finished silence of `duration` seconds that began at `offset`.
    pub fn handle_silence(&mut self, duration: f64, offset: f64) -> SilenceBoundary {
        self.state.end += duration;

        if duration < self.config.silence_threshold_secs {
            let gap_len = (self.config.sample_rate as f64 * duration) as usize;
            if gap_len > 0 {
                self.decoder.insert_audio(&vec![0.0; gap_len]);
            }
            return SilenceBoundary::Soft;
        }

        debug!("Long silence of {:.2}s, resetting decoder segment", duration);
        self.refresh_decoder();
        self.decoder.set_global_time_offset(duration + offset);
        SilenceBoundary::Hard
    }

    /// Close everything decoded so far and switch to `change.speaker`.
    pub fn handle_speaker_change(&mut self, change: ChangeSpeaker) -> IterationOutcome {
        let outcome = self.process_iteration(true);
        self.refresh_decoder();
        self.decoder.set_speaker(change.speaker);
        self.decoder.set_global_time_offset(change.start);
        outcome
    }

    /// Final pass at stream end, applying the undetected-language policy.
    pub fn finish(&mut self) -> IterationOutcome {
        let mut outcome = self.process_iteration(true);

        if !self.state.buffer.is_empty() {
            let withheld = std::mem::take(&mut self.state.buffer);
            if self.config.flush_undetected_language {
                info!(
                    "Language never detected, releasing {} withheld tokens",
                    withheld.len()
                );
                self.state.committed.extend_from_slice(&withheld);
                outcome.tokens.splice(0..0, withheld);
            } else {
                warn!(
                    "Language never detected, discarding {} withheld tokens",
                    withheld.len()
                );
            }
        }

        outcome
    }

    /// Pay model initialization cost on throwaway audio.
    ///
    /// Returns whether the pass succeeded; failures are only logged.
    pub fn warmup(&mut self, audio: &[f32], init_prompt: Option<&str>) -> bool {
        if let Some(prompt) = init_prompt.filter(|p| !p.is_empty()) {
            self.decoder.set_init_prompt(prompt);
        }
        self.decoder.insert_audio(audio);

        let result = self
            .decoder
            .infer(true)
            .and_then(|_| self.decoder.refresh_segment(true));

        match result {
            Ok(()) => {
                info!("Decoder warmed up on {} samples", audio.len());
                true
            }
            Err(e) => {
                warn!("Decoder warmup failed: {}", e);
                false
            }
        }
    }

    fn accept(&mut self, tokens: Vec<Token>) -> Vec<Token> {
        let Some(first) = tokens.first() else {
            return Vec::new();
        };

        let language = first.detected_language.clone();
        if self.config.is_auto_language() && language.is_none() {
            debug!("Withholding {} tokens until language is detected", tokens.len());
            self.state.buffer.extend(tokens);
            return Vec::new();
        }

        let withheld = std::mem::take(&mut self.state.buffer);
        let mut committed: Vec<Token> = Vec::with_capacity(withheld.len() + tokens.len());
        if self.config.release_withheld_on_detection {
            committed.extend(withheld.into_iter().map(|mut token| {
                if token.detected_language.is_none() {
                    token.detected_language = language.clone();
                }
                token
            }));
        } else if !withheld.is_empty() {
            debug!(
                "Language detected, dropping {} withheld tokens",
                withheld.len()
            );
        }
        committed.extend(tokens);

        self.state.commit(&committed);
        committed
    }

    fn recover(&mut self, err: DecodeError, is_last: bool) {
        if err.is_out_of_memory() {
            error!(
                "Decoder out of memory (is_last={}), resetting decoder: {}",
                is_last, err
            );
            self.decoder.release_memory();
            self.refresh_decoder();
            if self.config.oom_policy == OomPolicy::DiscardPending {
                self.state.buffer.clear();
            }
        } else {
            error!("Decoder processing error: {}", err);
        }
    }

    fn refresh_decoder(&mut self) {
        if let Err(e) = self.decoder.refresh_segment(true) {
            warn!("Failed to refresh decoder segment: {}", e);
        }
    }
}

impl Drop for StreamingProcessor {
    fn drop(&mut self) {
        self.decoder.release_memory();
    }
}

impl std::fmt::Debug for StreamingProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingProcessor")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}
