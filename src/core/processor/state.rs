use crate::core::timed::Token;

/// Per-session accumulator owned by one processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Committed tokens, in commit order. Only ever grows.
    pub committed: Vec<Token>,
    /// Tokens decoded but withheld, e.g. while the language is unknown.
    pub buffer: Vec<Token>,
    /// Audio-time cursor in seconds.
    pub end: f64,
    pub remaining_time_transcription: f64,
    pub remaining_time_diarization: f64,
}

impl SessionState {
    pub fn commit(&mut self, tokens: &[Token]) {
        self.committed.extend_from_slice(tokens);
        self.buffer.clear();
    }

    pub fn last_committed_end(&self) -> Option<f64> {
        self.committed.last().map(|t| t.end)
    }

    /// Refresh the lag between the cursor and the committed text.
    ///
    /// A final pass leaves nothing outstanding.
    pub fn update_remaining(&mut self, is_last: bool) {
        self.remaining_time_transcription = if is_last {
            0.0
        } else {
            let lag = self.end - self.last_committed_end().unwrap_or(0.0);
            (lag.max(0.0) * 10.0).round() / 10.0
        };
    }
}
