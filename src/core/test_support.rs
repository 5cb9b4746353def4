//! Scripted decoder stubs shared by unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::decoder::{
    Backend, BatchTranscriber, DecodeError, DecoderConfig, DecoderFactory, StreamingDecoder,
    TokenizerSpec,
};
use crate::core::timed::Token;

/// Everything a [`ScriptedDecoder`] was asked to do.
#[derive(Debug, Default, Clone)]
pub struct DecoderLog {
    pub inserted_samples: usize,
    pub inserts: Vec<Vec<f32>>,
    pub infer_calls: Vec<bool>,
    pub refreshes: Vec<bool>,
    pub global_time_offset: f64,
    pub speaker: i32,
    pub tokenizer: Option<TokenizerSpec>,
    pub init_prompt: Option<String>,
    pub released: usize,
}

pub type SharedLog = Arc<Mutex<DecoderLog>>;

/// Decoder that replays a fixed list of `infer` results, then returns nothing.
pub struct ScriptedDecoder {
    log: SharedLog,
    script: VecDeque<Result<Vec<Token>, DecodeError>>,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Result<Vec<Token>, DecodeError>>) -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: log.clone(),
                script: script.into(),
            },
            log,
        )
    }

    pub fn boxed(script: Vec<Result<Vec<Token>, DecodeError>>) -> (Box<dyn StreamingDecoder>, SharedLog) {
        let (decoder, log) = Self::new(script);
        (Box::new(decoder), log)
    }
}

impl StreamingDecoder for ScriptedDecoder {
    fn insert_audio(&mut self, samples: &[f32]) {
        let mut log = self.log.lock();
        log.inserted_samples += samples.len();
        log.inserts.push(samples.to_vec());
    }

    fn infer(&mut self, is_last: bool) -> Result<Vec<Token>, DecodeError> {
        self.log.lock().infer_calls.push(is_last);
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn refresh_segment(&mut self, complete: bool) -> Result<(), DecodeError> {
        self.log.lock().refreshes.push(complete);
        Ok(())
    }

    fn global_time_offset(&self) -> f64 {
        self.log.lock().global_time_offset
    }

    fn set_global_time_offset(&mut self, offset: f64) {
        self.log.lock().global_time_offset = offset;
    }

    fn speaker(&self) -> i32 {
        self.log.lock().speaker
    }

    fn set_speaker(&mut self, speaker: i32) {
        self.log.lock().speaker = speaker;
    }

    fn set_tokenizer(&mut self, tokenizer: TokenizerSpec) {
        self.log.lock().tokenizer = Some(tokenizer);
    }

    fn release_memory(&mut self) {
        self.log.lock().released += 1;
    }

    fn set_init_prompt(&mut self, prompt: &str) {
        self.log.lock().init_prompt = Some(prompt.to_string());
    }
}

/// Factory handing every session its own copy of the same script.
pub struct ScriptedFactory {
    backend: Backend,
    script: Vec<Result<Vec<Token>, DecodeError>>,
    logs: Mutex<Vec<SharedLog>>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<Result<Vec<Token>, DecodeError>>) -> Self {
        Self {
            backend: Backend::Reference,
            script,
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Logs of every decoder created so far, in creation order.
    pub fn logs(&self) -> Vec<SharedLog> {
        self.logs.lock().clone()
    }
}

impl DecoderFactory for ScriptedFactory {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn create(&self, _config: &DecoderConfig) -> Result<Box<dyn StreamingDecoder>, DecodeError> {
        let (decoder, log) = ScriptedDecoder::boxed(self.script.clone());
        self.logs.lock().push(log);
        Ok(decoder)
    }
}

/// Batch transcriber that replays fixed results and records audio lengths.
#[derive(Default)]
pub struct ScriptedBatch {
    results: Mutex<VecDeque<Result<String, DecodeError>>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedBatch {
    pub fn new(results: Vec<Result<String, DecodeError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sample count of every audio span transcribed so far.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }
}

impl BatchTranscriber for ScriptedBatch {
    fn transcribe_text(&self, audio: &[f32]) -> Result<String, DecodeError> {
        self.calls.lock().push(audio.len());
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
