//! Boundary to the external streaming decoder.
//!
//! The neural model and its commit policy live behind [`StreamingDecoder`];
//! this crate only drives it. Backends plug in by registering a
//! [`DecoderFactory`] with a [`BackendRegistry`] at startup.

mod backend;
mod base;
mod config;

pub use backend::{
    Backend, BackendError, BackendPreference, BackendRegistry, Capabilities, ModelCompatibility,
    select_backend,
};
pub use base::{
    BatchTranscriber, DecodeError, DecoderFactory, ModelSpec, StreamingDecoder, TokenizerSpec,
};
pub use config::{DecoderConfig, DecoderTask, DecoderType};
