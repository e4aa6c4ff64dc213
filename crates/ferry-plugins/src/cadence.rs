//! How often the AI responder may speak.
//!
//! A conversation's responder is invoked only when both hold: at least
//! `frequency_secs` have passed since the last invocation, and at least
//! `max_ignore` candidate messages have gone unanswered since then. Every
//! suppressed candidate counts toward the budget.

use dashmap::DashMap;
use tracing::debug;

use ferry_core::config::MAX_IGNORE_CAP;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceState {
    pub last_invoke: Option<i64>,
    pub ignored_since_invoke: u32,
}

pub struct CadenceGate {
    frequency_secs: i64,
    max_ignore: u32,
    states: DashMap<String, CadenceState>,
}

impl CadenceGate {
    /// `max_ignore` is clamped to `[0, 50]`.
    pub fn new(frequency_secs: u64, max_ignore: u32) -> Self {
        Self {
            frequency_secs: i64::try_from(frequency_secs).unwrap_or(i64::MAX),
            max_ignore: max_ignore.min(MAX_IGNORE_CAP),
            states: DashMap::new(),
        }
    }

    pub fn max_ignore(&self) -> u32 {
        self.max_ignore
    }

    /// Record a candidate message at `now` (Unix seconds) and decide whether
    /// the responder may be invoked for it.
    ///
    /// A conversation seen for the first time starts its clock at `now`, so
    /// its first candidate is suppressed unless `frequency_secs` is zero.
    pub fn check(&self, conversation: &str, now: i64) -> bool {
        let mut state = self.states.entry(conversation.to_string()).or_default();
        let last = *state.last_invoke.get_or_insert(now);

        if now - last < self.frequency_secs || state.ignored_since_invoke < self.max_ignore {
            state.ignored_since_invoke += 1;
            debug!(
                conversation,
                elapsed = now - last,
                ignored = state.ignored_since_invoke,
                "responder suppressed"
            );
            return false;
        }

        state.last_invoke = Some(now);
        state.ignored_since_invoke = 0;
        true
    }

    pub fn state(&self, conversation: &str) -> Option<CadenceState> {
        self.states.get(conversation).map(|s| *s)
    }
}
