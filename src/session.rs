use chrono::Local;
use std::path::Path;

use crate::corpus::Corpus;
use crate::engine::{DiffState, Keystroke, LiveStats};
use crate::error::{KataError, Result};
use crate::lesson::{self, LessonGenerator, WeakKey};
use crate::recorder::{session_from_state, SessionRecorder};
use crate::stats::{KeyStat, Session, StatsDb};

/// One practice run: the diff state plus whatever has been recorded for it
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: DiffState,
    recorded: Option<Session>,
}

impl SessionHandle {
    pub fn state(&self) -> &DiffState {
        &self.state
    }

    pub fn recorded(&self) -> Option<&Session> {
        self.recorded.as_ref()
    }
}

/// Entry point for the typing core.
///
/// Holds the statistics store when one could be opened. Without a store the
/// trainer still runs sessions, but ledger and recorder calls do nothing.
#[derive(Debug)]
pub struct Trainer {
    store: Option<StatsDb>,
}

impl Trainer {
    /// Open the store at `path`, falling back to running without statistics
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        match StatsDb::open(path.as_ref()) {
            Ok(db) => Self::with_store(db),
            Err(err) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    error = %err,
                    "statistics unavailable, continuing without them"
                );
                Self::disabled()
            }
        }
    }

    pub fn with_store(store: StatsDb) -> Self {
        Self { store: Some(store) }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn stats_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&StatsDb> {
        self.store.as_ref()
    }

    pub fn create_session(&self, target: &str) -> Result<SessionHandle> {
        if target.trim().is_empty() {
            return Err(KataError::EmptyTarget);
        }

        Ok(SessionHandle {
            state: DiffState::new(target),
            recorded: None,
        })
    }

    pub fn apply_keystroke(&self, handle: &mut SessionHandle, keystroke: Keystroke) {
        handle.state.apply_keystroke(keystroke);
    }

    pub fn is_finished(&self, handle: &SessionHandle) -> bool {
        handle.state.is_finished()
    }

    pub fn live_stats(&self, handle: &SessionHandle) -> LiveStats {
        handle.state.stats()
    }

    /// Persist the run and fold it into the ledger. Calling this again on the
    /// same handle returns the first result without writing anything.
    pub fn record_outcome(&mut self, handle: &mut SessionHandle) -> Result<Session> {
        if let Some(session) = &handle.recorded {
            return Ok(session.clone());
        }

        let now = Local::now();
        let session = match self.store.as_mut() {
            Some(store) => SessionRecorder::record(store, &handle.state, now)?,
            None => session_from_state(&handle.state, now.into(), now),
        };

        handle.recorded = Some(session.clone());
        Ok(session)
    }

    pub fn due_keys(&self, limit: usize) -> Result<Vec<KeyStat>> {
        match &self.store {
            Some(store) => store.due_keys(Local::now(), limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn weakest_keys(&self, limit: usize) -> Result<Vec<KeyStat>> {
        match &self.store {
            Some(store) => store.weakest_keys(limit),
            None => Ok(Vec::new()),
        }
    }

    /// Due keys first, then weakest keys, then nothing
    pub fn weakness_targets(&self, limit: usize) -> Vec<WeakKey> {
        let due = self.due_keys(limit).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "due key query failed");
            Vec::new()
        });

        let chosen = if due.is_empty() {
            self.weakest_keys(limit).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "weakest key query failed");
                Vec::new()
            })
        } else {
            due
        };

        lesson::weak_keys_from(&chosen)
    }

    /// Lesson drilling up to `limit` scheduled keys, or plain vocabulary
    /// when nothing is scheduled
    pub fn build_weakness_lesson(
        &self,
        generator: &mut LessonGenerator,
        corpus: &Corpus,
        length: usize,
        limit: usize,
    ) -> String {
        let weak_keys = self.weakness_targets(limit);
        generator.weakness_lesson(&weak_keys, corpus, length)
    }
}
