//! # WebSocket Transcription Handler
//!
//! This module binds one client connection to one transcription session.
//! Audio goes in as binary frames, incrementally updated transcript segments
//! come back as JSON messages.
//!
//! ## WebSocket API
//!
//! ### Connection Flow
//! 1. Client connects to `/asr` (or `/ws`), optionally with query parameters
//!    `session_id`, `source_system`, `case_ref`, `person_ref` and `user_id`
//! 2. Server records the session and sends a `config` message
//! 3. Client streams raw PCM16LE mono 16 kHz audio as binary frames
//! 4. Server sends `front_data` snapshots and `segment_update` revisions
//! 5. Client sends an empty binary frame when it stops recording
//! 6. Server flushes the remaining transcript and sends `ready_to_stop`
//!
//! If no decoder backend is available the connection is closed right away
//! with close code 1011 and no session is recorded.
//!
//! ### Message Types
//!
//! **Incoming Messages:**
//! - Binary messages are raw audio; an empty one ends the stream
//! - Text messages are not part of the protocol and end the session
//!
//! **Outgoing Messages:**
//! - `{"type": "config", "useAudioWorklet": true}` - Sent once at session start
//! - `{"type": "front_data", "status": "...", "lines": [...], ...}` - Transcript snapshot
//! - `{"type": "segment_update", "id": "...", "state": "FINAL", ...}` - Revision of a segment
//!   already present in an earlier snapshot
//! - `{"type": "ready_to_stop"}` - No more results will follow
//!
//! ### Segment Format
//!
//! ```json
//! {
//!   "speaker": 1,
//!   "text": "hello",
//!   "start": "00:00:00",
//!   "end": "00:00:00",
//!   "id": "seg_500_-1",
//!   "state": "LIVE",
//!   "start_ms": 500,
//!   "end_ms": 900,
//!   "text_live": "hello",
//!   "text_batch": null,
//!   "detected_language": "en"
//! }
//! ```
//!
//! Silence segments carry `"speaker": -2` and empty text. `translation` and
//! `detected_language` are omitted when absent.

mod error;
mod handler;
mod messages;
mod query;


pub use error::{WebSocketError, WebSocketResult};
pub use handler::asr_handler;
pub use messages::OutgoingMessage;
pub use query::SessionQuery;
