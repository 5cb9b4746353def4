pub mod assembler;
pub mod decoder;
pub mod engine;
pub mod pipeline;
pub mod processor;
pub mod timed;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for convenience
pub use assembler::SegmentAssembler;
pub use decoder::{
    Backend, BackendError, BackendPreference, BackendRegistry, BatchTranscriber, DecodeError,
    DecoderConfig, DecoderFactory, ModelSpec, StreamingDecoder, TokenizerSpec,
};
pub use engine::{EngineConfig, EngineError, TranscriptionEngine};
pub use pipeline::{AudioPipeline, PipelineError, ResultMessage};
pub use processor::{OomPolicy, ProcessorConfig, StreamingProcessor};
pub use timed::{
    ChangeSpeaker, FrontData, Segment, SegmentState, SegmentUpdate, SessionStatus, Silence, Token,
    Transcript,
};
