use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::entities::{Silence, TimedSpan, Token};
use super::{SPEAKER_SILENCE, SPEAKER_UNASSIGNED, format_time, segment_id, to_ms};

/// Lifecycle of a client-visible segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentState {
    Live,
    Final,
}

/// A span that can be folded into a [`Segment`].
pub trait SegmentSpan: TimedSpan {
    fn text(&self) -> &str;

    fn detected_language(&self) -> Option<&str> {
        None
    }
}

impl SegmentSpan for Token {
    fn text(&self) -> &str {
        &self.text
    }

    fn detected_language(&self) -> Option<&str> {
        self.detected_language.as_deref()
    }
}

impl SegmentSpan for Silence {
    fn text(&self) -> &str {
        ""
    }
}

/// Client-facing transcript unit with a stable id.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: String,
    pub state: SegmentState,
    /// Authoritative display text.
    pub text: String,
    /// Latest uncommitted rendering.
    pub text_live: Option<String>,
    /// Higher-latency batch-refined rendering, when one exists.
    pub text_batch: Option<String>,
    pub speaker: i32,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub translation: Option<String>,
    pub detected_language: Option<String>,
}

impl Segment {
    /// Build one segment from a contiguous run of same-kind spans.
    ///
    /// Returns `None` for an empty run.
    pub fn from_tokens<T: SegmentSpan>(spans: &[T], is_silence: bool) -> Option<Self> {
        let first = spans.first()?;
        let last = spans.last()?;

        let (text, speaker, detected_language) = if is_silence {
            (String::new(), SPEAKER_SILENCE, None)
        } else {
            let text: String = spans.iter().map(|s| s.text()).collect();
            (
                text,
                SPEAKER_UNASSIGNED,
                first.detected_language().map(str::to_string),
            )
        };

        let start = first.start();
        Some(Self {
            id: segment_id(start, speaker),
            state: SegmentState::Live,
            text_live: Some(text.clone()),
            text,
            text_batch: None,
            speaker,
            start,
            end: last.end(),
            translation: None,
            detected_language,
        })
    }

    pub fn is_silence(&self) -> bool {
        self.speaker == SPEAKER_SILENCE
    }

    pub fn is_final(&self) -> bool {
        self.state == SegmentState::Final
    }

    /// Whether the segment belongs in a serialized `lines` list.
    pub fn is_visible(&self) -> bool {
        !self.text.is_empty() || self.is_silence()
    }

    /// Move a LIVE segment to FINAL.
    ///
    /// Returns the patch describing the transition, or `None` when the
    /// segment was already final.
    pub fn finalize(&mut self) -> Option<SegmentUpdate> {
        if self.is_final() {
            return None;
        }
        self.state = SegmentState::Final;
        Some(SegmentUpdate {
            id: self.id.clone(),
            text_batch: self.text_batch.clone(),
            text_final: Some(self.text.clone()),
            state: Some(SegmentState::Final),
            start_ms: Some(to_ms(self.start)),
            end_ms: Some(to_ms(self.end)),
        })
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let speaker = if self.speaker == SPEAKER_UNASSIGNED {
            1
        } else {
            self.speaker
        };
        map.serialize_entry("speaker", &speaker)?;
        map.serialize_entry("text", &self.text)?;
        map.serialize_entry("start", &format_time(self.start.unwrap_or_default()))?;
        map.serialize_entry("end", &format_time(self.end.unwrap_or_default()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("state", &self.state)?;
        map.serialize_entry("start_ms", &to_ms(self.start))?;
        map.serialize_entry("end_ms", &to_ms(self.end))?;
        map.serialize_entry("text_live", &self.text_live)?;
        map.serialize_entry("text_batch", &self.text_batch)?;
        if let Some(translation) = &self.translation {
            map.serialize_entry("translation", translation)?;
        }
        if let Some(language) = &self.detected_language {
            map.serialize_entry("detected_language", language)?;
        }
        map.end()
    }
}

/// Patch for a segment the client has already received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentUpdate {
    pub id: String,
    pub text_batch: Option<String>,
    pub text_final: Option<String>,
    pub state: Option<SegmentState>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}
