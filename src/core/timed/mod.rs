//! Time-stamped text spans and the client-facing segment model.
//!
//! Everything in this module is plain data: tokens committed by the decoder,
//! transcripts built from them, silence markers, and the segments the
//! assembler exposes to clients. Times are seconds relative to the start of
//! the session's audio stream.

mod entities;
mod front_data;
mod segment;

pub use entities::{ChangeSpeaker, Silence, TimedSpan, Token, Transcript};
pub use front_data::{FrontData, SessionStatus};
pub use segment::{Segment, SegmentSpan, SegmentState, SegmentUpdate};

/// Speaker index for tokens that have not been attributed to anyone.
pub const SPEAKER_UNASSIGNED: i32 = -1;

/// Speaker sentinel marking a silence segment (a gap, not a speech unit).
pub const SPEAKER_SILENCE: i32 = -2;

/// Format seconds as `HH:MM:SS`, truncating fractional seconds.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Convert seconds to whole milliseconds, `None` maps to zero.
pub fn to_ms(seconds: Option<f64>) -> i64 {
    seconds.map(|s| (s * 1000.0).round() as i64).unwrap_or(0)
}

/// Stable segment identifier derived from its start time and speaker.
pub fn segment_id(start: Option<f64>, speaker: i32) -> String {
    format!("seg_{}_{}", to_ms(start), speaker)
}
