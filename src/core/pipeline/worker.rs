use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::assembler::SegmentAssembler;
use crate::core::processor::{SilenceBoundary, SilenceDetector, SilenceEvent, StreamingProcessor};
use crate::core::timed::{ChangeSpeaker, FrontData, SessionStatus, Silence};

use super::audio::{pcm16_bytes_to_f32, samples_to_secs};
use super::batch::BatchRefiner;
use super::{PipelineCommand, ResultMessage};

/// Blocking loop that owns one session's processing state.
pub(super) struct SessionWorker {
    session_id: String,
    processor: StreamingProcessor,
    assembler: SegmentAssembler,
    detector: SilenceDetector,
    batch: Option<BatchRefiner>,
    results: mpsc::UnboundedSender<ResultMessage>,
    /// Audio time received from the client so far, silences included.
    received_secs: f64,
    /// The ongoing silence already closed the live segment.
    long_silence_closed: bool,
    last_front: Option<FrontData>,
}

impl SessionWorker {
    pub(super) fn new(
        session_id: String,
        processor: StreamingProcessor,
        detector: SilenceDetector,
        batch: Option<BatchRefiner>,
        results: mpsc::UnboundedSender<ResultMessage>,
    ) -> Self {
        Self {
            session_id,
            processor,
            assembler: SegmentAssembler::new(),
            detector,
            batch,
            results,
            received_secs: 0.0,
            long_silence_closed: false,
            last_front: None,
        }
    }

    pub(super) fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>) {
        while let Some(command) = commands.blocking_recv() {
            match command {
                PipelineCommand::Audio(bytes) => self.handle_audio(&bytes),
                PipelineCommand::SpeakerChange(change) => self.handle_speaker_change(change),
                PipelineCommand::Stop => {
                    debug!(session_id = %self.session_id, "Stop requested");
                    break;
                }
            }
        }
        self.finish();
        // Dropping self releases the processor and closes the result stream.
    }

    fn handle_audio(&mut self, bytes: &[u8]) {
        let samples = pcm16_bytes_to_f32(bytes);
        if samples.is_empty() {
            return;
        }
        if let Some(batch) = &mut self.batch {
            batch.record(&samples);
        }

        let chunk_start = self.received_secs;
        self.received_secs += samples_to_secs(samples.len(), self.processor.config().sample_rate);
        let chunk_end = self.received_secs;

        match self.detector.observe(&samples, chunk_start, chunk_end) {
            SilenceEvent::Speech | SilenceEvent::Quiet => self.feed(&samples, chunk_end),
            SilenceEvent::SilenceStarted(silence) => {
                let outcome = self.processor.start_silence();
                self.assembler.push_tokens(&outcome.tokens);
                self.close_if_long(&silence);
            }
            SilenceEvent::SilenceContinues(silence) => self.close_if_long(&silence),
            SilenceEvent::SilenceEnded(silence) => {
                self.end_silence(&silence);
                self.feed(&samples, chunk_end);
            }
        }

        self.emit(SessionStatus::ActiveTranscription);
    }

    fn feed(&mut self, samples: &[f32], chunk_end: f64) {
        self.processor.insert_audio(samples, chunk_end);
        let outcome = self.processor.process_iteration(false);
        self.assembler.push_tokens(&outcome.tokens);
    }

    fn close_if_long(&mut self, silence: &Silence) {
        let threshold = self.processor.config().silence_threshold_secs;
        if !self.long_silence_closed && silence.duration.unwrap_or_default() >= threshold {
            self.assembler.close_live();
            self.long_silence_closed = true;
        }
    }

    fn end_silence(&mut self, silence: &Silence) {
        let duration = silence.duration.unwrap_or_default();
        let offset = silence.start.unwrap_or_default();

        if self.processor.handle_silence(duration, offset) == SilenceBoundary::Hard {
            self.assembler.push_silence(silence);
        }
        self.long_silence_closed = false;
    }

    fn handle_speaker_change(&mut self, change: ChangeSpeaker) {
        debug!(
            session_id = %self.session_id,
            "Speaker {} takes over at {:.2}s", change.speaker, change.start
        );
        let outcome = self.processor.handle_speaker_change(change);
        self.assembler.push_tokens(&outcome.tokens);
        self.assembler.close_live();
        self.emit(SessionStatus::ActiveTranscription);
    }

    fn finish(&mut self) {
        if let Some(silence) = self.detector.flush(self.received_secs) {
            self.end_silence(&silence);
        }

        let outcome = self.processor.finish();
        self.assembler.push_tokens(&outcome.tokens);
        self.assembler.finish();

        let heard_speech = self
            .assembler
            .segments()
            .iter()
            .any(|s| !s.is_silence() && s.is_visible());
        let status = if heard_speech {
            SessionStatus::ActiveTranscription
        } else {
            SessionStatus::NoAudioDetected
        };
        self.emit(status);

        info!(
            session_id = %self.session_id,
            "Pipeline finished after {:.2}s of audio, {} segments",
            self.received_secs,
            self.assembler.segments().len()
        );
    }

    /// Queue batch text for segments that just went FINAL.
    fn refine_finalized(&mut self) {
        let finalized = self.assembler.take_finalized();
        let Some(batch) = &mut self.batch else {
            return;
        };
        for segment in finalized {
            if let Some(text) = batch.refine(&segment) {
                debug!(session_id = %self.session_id, "Batch text for {}", segment.id);
                self.assembler.apply_batch_text(&segment.id, text);
            }
        }
    }

    /// Send a snapshot if anything changed, then updates for segments the
    /// client had already seen before this step.
    fn emit(&mut self, status: SessionStatus) {
        self.refine_finalized();
        let updates = self.assembler.take_updates();

        let state = self.processor.state();
        let front = FrontData {
            status,
            lines: self.assembler.segments().to_vec(),
            buffer_transcription: self.processor.buffer_preview().text,
            remaining_time_transcription: state.remaining_time_transcription,
            remaining_time_diarization: state.remaining_time_diarization,
            ..Default::default()
        };

        if self.last_front.as_ref() != Some(&front) {
            // Receiver gone means the connection closed; keep processing so
            // cleanup still runs in order.
            let _ = self.results.send(ResultMessage::FrontData(front.clone()));
            self.assembler.mark_emitted();
            self.last_front = Some(front);
        }

        for update in updates {
            let _ = self.results.send(ResultMessage::SegmentUpdate(update));
        }
    }
}
