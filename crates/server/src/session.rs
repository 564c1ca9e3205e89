//! Per-connection session state
//!
//! One `SessionState` per WebSocket connection, owned exclusively by
//! its orchestrator task. Holds the learner's L1, the utterance
//! counter, and the partial-emission debounce state.

use std::time::{Duration, Instant};

use bgcoach_core::L1;
use bgcoach_grammar::fold_for_key;

/// Minimum gap between partial ASR passes.
pub const PARTIAL_INTERVAL: Duration = Duration::from_millis(250);

/// Session lifecycle states (§ orchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    Listening,
    Transcribing,
    Coaching,
    Closed,
}

pub struct SessionState {
    pub id: String,
    pub l1: L1,
    pub phase: SessionPhase,
    pub created_at: Instant,
    /// Completed utterances in this session.
    pub utterances: u64,
    last_partial_at: Option<Instant>,
    last_partial_text: String,
}

impl SessionState {
    pub fn new(l1: L1) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            l1,
            phase: SessionPhase::Connected,
            created_at: Instant::now(),
            utterances: 0,
            last_partial_at: None,
            last_partial_text: String::new(),
        }
    }

    /// True when enough time has passed to schedule another partial
    /// pass. Marks the attempt.
    pub fn allow_partial(&mut self, now: Instant) -> bool {
        match self.last_partial_at {
            Some(last) if now.duration_since(last) < PARTIAL_INTERVAL => false,
            _ => {
                self.last_partial_at = Some(now);
                true
            }
        }
    }

    /// Debounce partial text: identical output (after whitespace
    /// normalization) is suppressed to reduce UI churn.
    pub fn accept_partial_text(&mut self, text: &str) -> bool {
        let folded = fold_for_key(text);
        if folded.is_empty() || folded == self.last_partial_text {
            return false;
        }
        self.last_partial_text = folded;
        true
    }

    /// Reset per-utterance partial state once an utterance closes.
    pub fn reset_partials(&mut self) {
        self.last_partial_at = None;
        self.last_partial_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_debounce_interval() {
        let mut session = SessionState::new(L1::Pl);
        let t0 = Instant::now();
        assert!(session.allow_partial(t0));
        assert!(!session.allow_partial(t0 + Duration::from_millis(100)));
        assert!(session.allow_partial(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_partial_text_dedupe() {
        let mut session = SessionState::new(L1::Pl);
        assert!(session.accept_partial_text("искам кафе"));
        // Identical after whitespace normalization.
        assert!(!session.accept_partial_text("Искам  кафе"));
        assert!(session.accept_partial_text("искам кафе сега"));
        // Empty partials never go out.
        assert!(!session.accept_partial_text("   "));
    }

    #[test]
    fn test_reset_partials_allows_repeat_in_next_utterance() {
        let mut session = SessionState::new(L1::Pl);
        assert!(session.accept_partial_text("искам кафе"));
        session.reset_partials();
        assert!(session.accept_partial_text("искам кафе"));
    }
}
