//! WebSocket message types

use serde::Serialize;

use crate::core::pipeline::ResultMessage;
use crate::core::timed::{FrontData, SegmentUpdate};

/// WebSocket message types for outgoing messages
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "config")]
    Config {
        #[serde(rename = "useAudioWorklet")]
        use_audio_worklet: bool,
    },
    #[serde(rename = "front_data")]
    FrontData(FrontData),
    #[serde(rename = "segment_update")]
    SegmentUpdate(SegmentUpdate),
    #[serde(rename = "ready_to_stop")]
    ReadyToStop,
}

impl From<ResultMessage> for OutgoingMessage {
    fn from(result: ResultMessage) -> Self {
        match result {
            ResultMessage::FrontData(front) => OutgoingMessage::FrontData(front),
            ResultMessage::SegmentUpdate(update) => OutgoingMessage::SegmentUpdate(update),
        }
    }
}
