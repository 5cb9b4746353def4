//! Streaming session processor.
//!
//! Turns raw audio chunks into committed tokens while hiding decoder
//! instability from the rest of the system. One processor serves exactly one
//! session and is never shared.

mod config;
mod silence;
mod state;
mod streaming;


pub use config::{DEFAULT_SILENCE_THRESHOLD_SECS, OomPolicy, ProcessorConfig, SAMPLE_RATE};
pub use silence::{SilenceDetector, SilenceDetectorConfig, SilenceEvent};
pub use state::SessionState;
pub use streaming::{IterationOutcome, SilenceBoundary, StreamingProcessor};
