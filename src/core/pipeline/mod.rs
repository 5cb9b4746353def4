//! Per-session audio pipeline.
//!
//! Each session gets one [`AudioPipeline`]: a dedicated blocking worker that
//! exclusively owns the session's [`StreamingProcessor`] and segment
//! assembler, fed through a bounded command channel. Results flow back over
//! an unbounded channel that closes once the worker has flushed everything,
//! which is how callers learn the stream is over.
//!
//! [`StreamingProcessor`]: crate::core::processor::StreamingProcessor

pub mod audio;
mod batch;
mod worker;


use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::engine::{EngineError, TranscriptionEngine};
use crate::core::processor::SilenceDetector;
use crate::core::timed::{ChangeSpeaker, FrontData, SegmentUpdate};

use batch::BatchRefiner;
use worker::SessionWorker;

/// Commands are small; a short queue is enough to absorb bursts of frames
/// while the decoder is busy.
const COMMAND_BUFFER_SIZE: usize = 64;

/// Result produced for the client, in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ResultMessage {
    #[serde(rename = "front_data")]
    FrontData(FrontData),
    #[serde(rename = "segment_update")]
    SegmentUpdate(SegmentUpdate),
}

#[derive(Debug)]
pub(crate) enum PipelineCommand {
    Audio(Bytes),
    SpeakerChange(ChangeSpeaker),
    Stop,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline worker has stopped")]
    WorkerStopped,
    #[error("Failed to create session processor: {0}")]
    Processor(#[from] EngineError),
}

/// Handle on one session's worker.
#[derive(Debug)]
pub struct AudioPipeline {
    session_id: String,
    commands: Option<mpsc::Sender<PipelineCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl AudioPipeline {
    /// Create the session's processor and start its worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        engine: &TranscriptionEngine,
        session_id: impl Into<String>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ResultMessage>), PipelineError> {
        let session_id = session_id.into();
        let processor = engine.create_processor()?;
        let detector = SilenceDetector::new(engine.config().silence);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let batch = engine
            .batch_transcriber()
            .map(|transcriber| BatchRefiner::new(transcriber, engine.config().processor.sample_rate));
        let worker = SessionWorker::new(session_id.clone(), processor, detector, batch, result_tx);
        let handle = tokio::task::spawn_blocking(move || worker.run(command_rx));

        info!(session_id = %session_id, "Audio pipeline started");

        Ok((
            Self {
                session_id,
                commands: Some(command_tx),
                worker: Some(handle),
            },
            result_rx,
        ))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue one PCM16LE frame. An empty frame means the client stopped.
    pub async fn process_audio(&self, data: Bytes) -> Result<(), PipelineError> {
        if data.is_empty() {
            debug!(session_id = %self.session_id, "Empty audio frame, stopping pipeline");
            return self.send(PipelineCommand::Stop).await;
        }
        self.send(PipelineCommand::Audio(data)).await
    }

    pub async fn change_speaker(&self, change: ChangeSpeaker) -> Result<(), PipelineError> {
        self.send(PipelineCommand::SpeakerChange(change)).await
    }

    /// Ask the worker to flush and end the result stream.
    pub async fn stop(&self) -> Result<(), PipelineError> {
        self.send(PipelineCommand::Stop).await
    }

    async fn send(&self, command: PipelineCommand) -> Result<(), PipelineError> {
        let Some(commands) = &self.commands else {
            return Err(PipelineError::WorkerStopped);
        };
        commands
            .send(command)
            .await
            .map_err(|_| PipelineError::WorkerStopped)
    }

    /// Close the command channel and wait for the worker to release the
    /// processor.
    pub async fn cleanup(mut self) {
        info!(session_id = %self.session_id, "Cleaning up audio pipeline");
        self.commands.take();

        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            error!(session_id = %self.session_id, "Pipeline worker failed: {}", e);
        }

        info!(session_id = %self.session_id, "Audio pipeline cleaned up");
    }
}
