use serde::{Serialize, Serializer};

use super::segment::Segment;

/// Coarse session status shown by clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    ActiveTranscription,
    NoAudioDetected,
}

/// Snapshot of everything a client renders: segments plus buffer previews.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrontData {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(serialize_with = "serialize_visible_lines")]
    pub lines: Vec<Segment>,
    pub buffer_transcription: String,
    pub buffer_diarization: String,
    pub buffer_translation: String,
    pub remaining_time_transcription: f64,
    pub remaining_time_diarization: f64,
}

impl FrontData {
    /// Segments that will appear in the serialized `lines`.
    pub fn visible_lines(&self) -> impl Iterator<Item = &Segment> {
        self.lines.iter().filter(|s| s.is_visible())
    }
}

// Empty speech segments stay in history but never reach the wire.
fn serialize_visible_lines<S: Serializer>(
    lines: &[Segment],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(lines.iter().filter(|s| s.is_visible()))
}
