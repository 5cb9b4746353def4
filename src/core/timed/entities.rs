use serde::Serialize;

use super::SPEAKER_UNASSIGNED;

const PUNCTUATION_MARKS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Anything with a start and end on the audio timeline.
///
/// Bounds are only absent before the first data arrives.
pub trait TimedSpan {
    fn start(&self) -> Option<f64>;
    fn end(&self) -> Option<f64>;

    fn duration(&self) -> Option<f64> {
        Some(self.end()? - self.start()?)
    }

    /// True when `other` lies entirely inside this span.
    fn contains_timespan(&self, other: &dyn TimedSpan) -> bool {
        match (self.start(), self.end(), other.start(), other.end()) {
            (Some(s0), Some(e0), Some(s1), Some(e1)) => s0 <= s1 && e0 >= e1,
            _ => false,
        }
    }

    fn is_within(&self, other: &dyn TimedSpan) -> bool
    where
        Self: Sized,
    {
        other.contains_timespan(self)
    }
}

/// A committed decoder output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

impl Token {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            speaker: SPEAKER_UNASSIGNED,
            detected_language: None,
        }
    }

    pub fn with_speaker(mut self, speaker: i32) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.detected_language = Some(language.into());
        self
    }

    /// Returns a copy shifted by `offset` seconds.
    pub fn with_offset(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            ..self.clone()
        }
    }

    pub fn has_punctuation(&self) -> bool {
        self.text.trim().chars().any(|c| PUNCTUATION_MARKS.contains(&c))
    }
}

impl TimedSpan for Token {
    fn start(&self) -> Option<f64> {
        Some(self.start)
    }

    fn end(&self) -> Option<f64> {
        Some(self.end)
    }
}

/// Several tokens collapsed into one span of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: String,
}

impl Transcript {
    /// Join `tokens` with `sep`, shifting the bounds by `offset`.
    ///
    /// An empty token list yields an empty transcript with unset bounds.
    pub fn from_tokens(tokens: &[Token], sep: &str, offset: f64) -> Self {
        let text = tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(sep);

        Self {
            start: tokens.first().map(|t| t.start + offset),
            end: tokens.last().map(|t| t.end + offset),
            text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl TimedSpan for Transcript {
    fn start(&self) -> Option<f64> {
        self.start
    }

    fn end(&self) -> Option<f64> {
        self.end
    }
}

/// A stretch of audio without speech.
///
/// `is_starting` is set while the gap is still being observed; `has_ended`
/// once speech (or the end of the stream) closed it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Silence {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
    pub is_starting: bool,
    pub has_ended: bool,
}

impl Silence {
    /// A silence that began at `start` and is still ongoing.
    pub fn starting_at(start: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(start),
            duration: Some(0.0),
            is_starting: true,
            has_ended: false,
        }
    }

    /// Recompute `duration` from the bounds.
    pub fn compute_duration(&mut self) -> Option<f64> {
        self.duration = TimedSpan::duration(&*self);
        self.duration
    }

    /// Extend the gap to `end` without closing it.
    pub fn extend_to(&mut self, end: f64) {
        self.end = Some(end);
        self.compute_duration();
    }

    /// Close the gap at `end`.
    pub fn close_at(&mut self, end: f64) {
        self.extend_to(end);
        self.is_starting = false;
        self.has_ended = true;
    }
}

impl TimedSpan for Silence {
    fn start(&self) -> Option<f64> {
        self.start
    }

    fn end(&self) -> Option<f64> {
        self.end
    }
}

/// A diarization event: `speaker` takes over from `start` onward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeSpeaker {
    pub speaker: i32,
    pub start: f64,
}
