//! Segment assembly.
//!
//! Projects the flat history of committed tokens and silences into a short
//! list of stably identified segments. At most one speech segment is LIVE at
//! a time; every boundary (long silence, speaker change, stream end) turns it
//! FINAL, after which it is never touched again.

use std::collections::HashSet;

use tracing::debug;

use crate::core::timed::{Segment, SegmentState, SegmentUpdate, Silence, Token};

#[derive(Debug, Default)]
pub struct SegmentAssembler {
    segments: Vec<Segment>,
    /// Tokens making up the LIVE segment, if any.
    live_tokens: Vec<Token>,
    live_index: Option<usize>,
    /// Ids already delivered to the client in a snapshot.
    emitted: HashSet<String>,
    pending_updates: Vec<SegmentUpdate>,
    /// Speech segments turned FINAL since the last `take_finalized`.
    finalized: Vec<usize>,
}

impl SegmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn live_segment(&self) -> Option<&Segment> {
        self.live_index.and_then(|i| self.segments.get(i))
    }

    /// Append committed tokens to the LIVE segment, opening one if needed.
    ///
    /// Returns whether anything changed.
    pub fn push_tokens(&mut self, tokens: &[Token]) -> bool {
        if tokens.is_empty() {
            return false;
        }
        self.live_tokens.extend_from_slice(tokens);

        let Some(segment) = Segment::from_tokens(&self.live_tokens, false) else {
            return false;
        };
        match self.live_index {
            Some(index) => self.segments[index] = segment,
            None => {
                debug!("Opening segment {}", segment.id);
                self.live_index = Some(self.segments.len());
                self.segments.push(segment);
            }
        }
        true
    }

    /// Turn the LIVE segment FINAL.
    pub fn close_live(&mut self) -> bool {
        let Some(index) = self.live_index.take() else {
            return false;
        };
        self.live_tokens.clear();

        let segment = &mut self.segments[index];
        match segment.finalize() {
            Some(update) => {
                debug!("Segment {} is final", segment.id);
                self.pending_updates.push(update);
                self.finalized.push(index);
                true
            }
            None => false,
        }
    }

    /// Close the LIVE segment and record `silence` as a gap segment.
    pub fn push_silence(&mut self, silence: &Silence) -> bool {
        self.close_live();
        let Some(mut segment) = Segment::from_tokens(std::slice::from_ref(silence), true) else {
            return false;
        };
        segment.state = SegmentState::Final;
        self.segments.push(segment);
        true
    }

    /// Stream ended: nothing can alter the LIVE segment anymore.
    pub fn finish(&mut self) -> bool {
        self.close_live()
    }

    /// Speech segments that went FINAL since the last call, in order.
    pub fn take_finalized(&mut self) -> Vec<Segment> {
        self.finalized
            .drain(..)
            .filter_map(|index| self.segments.get(index).cloned())
            .collect()
    }

    /// Attach batch-refined text to a FINAL segment and queue the patch.
    pub fn apply_batch_text(&mut self, id: &str, text: String) -> bool {
        let Some(segment) = self
            .segments
            .iter_mut()
            .find(|s| s.id == id && s.is_final())
        else {
            return false;
        };
        segment.text_batch = Some(text.clone());
        self.pending_updates.push(SegmentUpdate {
            id: segment.id.clone(),
            text_batch: Some(text),
            text_final: None,
            state: None,
            start_ms: None,
            end_ms: None,
        });
        true
    }

    /// Remember which segments the client has now seen.
    pub fn mark_emitted(&mut self) {
        self.emitted.extend(
            self.segments
                .iter()
                .filter(|s| s.is_visible())
                .map(|s| s.id.clone()),
        );
    }

    /// Drain queued updates for segments the client already knows.
    ///
    /// Updates for never-emitted segments are dropped; their final state
    /// reaches the client through the next snapshot instead.
    pub fn take_updates(&mut self) -> Vec<SegmentUpdate> {
        let emitted = &self.emitted;
        self.pending_updates
            .drain(..)
            .filter(|u| emitted.contains(&u.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timed::SPEAKER_SILENCE;

    fn token(start: f64, end: f64, text: &str) -> Token {
        Token::new(start, end, text)
    }

    fn long_silence() -> Silence {
        let mut silence = Silence::starting_at(1.0);
        silence.close_at(7.0);
        silence
    }

    #[test]
    fn test_tokens_grow_live_segment_with_stable_id() {
        let mut assembler = SegmentAssembler::new();

        assert!(assembler.push_tokens(&[token(0.5, 0.75, "hel")]));
        let id = assembler.live_segment().unwrap().id.clone();

        assert!(assembler.push_tokens(&[token(0.75, 1.0, "lo")]));
        let live = assembler.live_segment().unwrap();

        assert_eq!(live.id, id);
        assert_eq!(live.text, "hello");
        assert_eq!(live.end, Some(1.0));
        assert_eq!(live.state, SegmentState::Live);
        assert_eq!(assembler.segments().len(), 1);
    }

    #[test]
    fn test_empty_push_is_noop() {
        let mut assembler = SegmentAssembler::new();
        assert!(!assembler.push_tokens(&[]));
        assert!(assembler.segments().is_empty());
    }

    #[test]
    fn test_update_only_after_emission() {
        let mut assembler = SegmentAssembler::new();
        assembler.push_tokens(&[token(0.5, 1.0, "hello")]);
        assembler.close_live();

        assert!(assembler.take_updates().is_empty());
        assert!(assembler.segments()[0].is_final());

        assembler.push_tokens(&[token(2.0, 2.5, "again")]);
        assembler.mark_emitted();
        assembler.close_live();

        let updates = assembler.take_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, assembler.segments()[1].id);
        assert_eq!(updates[0].state, Some(SegmentState::Final));
        assert_eq!(updates[0].text_final.as_deref(), Some("again"));
    }

    #[test]
    fn test_final_segment_is_never_reopened() {
        let mut assembler = SegmentAssembler::new();
        assembler.push_tokens(&[token(0.5, 1.0, "hello")]);
        assembler.close_live();
        assembler.push_tokens(&[token(1.5, 2.0, "world")]);

        assert_eq!(assembler.segments().len(), 2);
        assert_eq!(assembler.segments()[0].text, "hello");
        assert!(assembler.segments()[0].is_final());
        assert_eq!(assembler.segments()[1].text, "world");
        assert!(assembler.close_live());
        assert!(assembler.segments()[1].is_final());
    }

    #[test]
    fn test_silence_closes_live_and_adds_gap() {
        let mut assembler = SegmentAssembler::new();
        assembler.push_tokens(&[token(0.5, 1.0, "hello")]);
        assembler.mark_emitted();

        assert!(assembler.push_silence(&long_silence()));

        let segments = assembler.segments();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_final());
        assert_eq!(segments[1].speaker, SPEAKER_SILENCE);
        assert_eq!(segments[1].text, "");
        assert!(segments[1].is_final());
        assert_eq!(assembler.take_updates().len(), 1);
        assert!(assembler.live_segment().is_none());
    }

    #[test]
    fn test_batch_text_follows_final_update() {
        let mut assembler = SegmentAssembler::new();
        assembler.push_tokens(&[token(0.5, 1.0, "hello")]);
        assembler.mark_emitted();
        assembler.push_silence(&long_silence());

        let finalized = assembler.take_finalized();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].text, "hello");
        assert!(assembler.take_finalized().is_empty());

        let id = finalized[0].id.clone();
        assert!(assembler.apply_batch_text(&id, "Hello.".to_string()));
        assert_eq!(assembler.segments()[0].text_batch.as_deref(), Some("Hello."));

        let updates = assembler.take_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].state, Some(SegmentState::Final));
        assert_eq!(updates[1].id, id);
        assert_eq!(updates[1].text_batch.as_deref(), Some("Hello."));
        assert!(updates[1].state.is_none());
    }

    #[test]
    fn test_batch_text_needs_final_segment() {
        let mut assembler = SegmentAssembler::new();
        assembler.push_tokens(&[token(0.5, 1.0, "hello")]);
        let id = assembler.live_segment().unwrap().id.clone();

        assert!(!assembler.apply_batch_text(&id, "Hello.".to_string()));
        assert!(!assembler.apply_batch_text("seg_0_-1", "nothing".to_string()));
    }

    #[test]
    fn test_finish_without_live_segment() {
        let mut assembler = SegmentAssembler::new();
        assert!(!assembler.finish());
    }
}
