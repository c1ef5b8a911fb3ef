use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::engine::DiffState;
use crate::error::Result;
use crate::sm2::quality_for;
use crate::stats::{Session, StatsDb};

/// Outcome counts for one character within a single session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDelta {
    pub errors: u64,
    pub successes: u64,
}

impl KeyDelta {
    pub fn attempts(&self) -> u64 {
        self.errors + self.successes
    }

    /// Accuracy of this character within the session, 0–100
    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 100.0,
            total => self.successes as f64 / total as f64 * 100.0,
        }
    }
}

/// Per-character deltas with a stable iteration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyDeltas {
    deltas: BTreeMap<char, KeyDelta>,
}

impl KeyDeltas {
    /// Classify every typed position against the target character it covers
    pub fn from_diff(target: &[char], input: &[char]) -> Self {
        let mut deltas = Self::default();
        for (&expected, &typed) in target.iter().zip(input.iter()) {
            deltas.observe(expected, expected == typed);
        }
        deltas
    }

    pub fn observe(&mut self, key: char, correct: bool) {
        let entry = self.deltas.entry(key).or_default();
        if correct {
            entry.successes += 1;
        } else {
            entry.errors += 1;
        }
    }

    pub fn get(&self, key: char) -> Option<&KeyDelta> {
        self.deltas.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn to_vec(&self) -> Vec<(char, KeyDelta)> {
        self.deltas.iter().map(|(k, d)| (*k, *d)).collect()
    }
}

/// Build the immutable session record from a diff state's final metrics
pub fn session_from_state(state: &DiffState, at: SystemTime, timestamp: DateTime<Local>) -> Session {
    let stats = state.stats_at(at);
    Session {
        id: None,
        text: state.target_text(),
        wpm: stats.wpm,
        accuracy: stats.accuracy,
        duration_secs: stats.duration_secs,
        error_count: state.error_count(),
        timestamp,
    }
}

/// Persists a finished (or abandoned) run and folds it into the key ledger
pub struct SessionRecorder;

impl SessionRecorder {
    /// Write the session and every character delta in one transaction.
    ///
    /// Each touched character also gets one SM-2 review whose quality comes
    /// from that character's accuracy in this run.
    pub fn record(store: &mut StatsDb, state: &DiffState, now: DateTime<Local>) -> Result<Session> {
        let mut session = session_from_state(state, now.into(), now);
        let deltas = KeyDeltas::from_diff(state.target(), state.input());

        let result = store.record_session_batch(&session, &deltas.to_vec(), now, |stat, delta| {
            stat.update_sm2(quality_for(delta.accuracy()), now);
        });

        match result {
            Ok(id) => {
                tracing::info!(
                    session_id = id,
                    keys = deltas.len(),
                    wpm = session.wpm,
                    accuracy = session.accuracy,
                    "recorded session"
                );
                session.id = Some(id);
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "recording session failed, ledger unchanged");
                Err(err)
            }
        }
    }
}
