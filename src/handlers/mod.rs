//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `sessions` - Session bookkeeping endpoints
//! - `ws` - WebSocket real-time transcription

pub mod api;
pub mod sessions;
pub mod ws;

// Re-export commonly used handlers for convenient access
pub use ws::asr_handler;
