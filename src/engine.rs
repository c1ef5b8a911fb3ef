use std::time::SystemTime;

use crate::stats::time_diff_secs;

/// Correctness of a single typed position
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// A keystroke as seen by the diff engine, already decoupled from the terminal
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// Any printable glyph, appended verbatim
    Char(char),
    Enter,
    Tab,
    Backspace,
    /// Removes one trailing word plus the whitespace that followed it
    DeleteWord,
    /// Control keys with no printable representation
    Ignored,
}

/// Live (or final) metrics derived from a diff state
#[derive(Clone, Debug, Copy, PartialEq, Default)]
pub struct LiveStats {
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_secs: f64,
}

/// Characters treated as word boundaries by [`Keystroke::DeleteWord`]
fn is_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// Returns the length `input` should be truncated to after deleting the last word.
pub fn delete_last_word(input: &[char]) -> usize {
    let Some(end) = input.iter().rposition(|&c| !is_boundary(c)) else {
        return 0;
    };

    match input[..=end].iter().rposition(|&c| is_boundary(c)) {
        Some(boundary) => boundary + 1,
        None => 0,
    }
}

/// Counts mismatched positions plus any excess input beyond the target
pub fn count_errors(target: &[char], input: &[char]) -> usize {
    let mismatches = target
        .iter()
        .zip(input.iter())
        .filter(|(t, i)| t != i)
        .count();

    mismatches + input.len().saturating_sub(target.len())
}

/// Per-run state of one practice attempt against a fixed target
#[derive(Debug, Clone)]
pub struct DiffState {
    target: Vec<char>,
    input: Vec<char>,
    started_at: Option<SystemTime>,
    ended_at: Option<SystemTime>,
    finished: bool,
    error_count: usize,
}

impl DiffState {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            input: Vec::new(),
            started_at: None,
            ended_at: None,
            finished: false,
            error_count: 0,
        }
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn input_text(&self) -> String {
        self.input.iter().collect()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<SystemTime> {
        self.ended_at
    }

    /// Outcome of every typed position, excess keystrokes included
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.input
            .iter()
            .enumerate()
            .map(|(idx, c)| match self.target.get(idx) {
                Some(expected) if expected == c => Outcome::Correct,
                _ => Outcome::Incorrect,
            })
            .collect()
    }

    pub fn apply_keystroke(&mut self, keystroke: Keystroke) {
        self.apply_keystroke_at(keystroke, SystemTime::now());
    }

    pub fn apply_keystroke_at(&mut self, keystroke: Keystroke, now: SystemTime) {
        if self.finished {
            return;
        }

        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        match keystroke {
            Keystroke::Backspace => {
                self.input.pop();
            }
            Keystroke::DeleteWord => {
                let len = delete_last_word(&self.input);
                self.input.truncate(len);
            }
            Keystroke::Enter => self.input.push('\n'),
            Keystroke::Tab => self.input.push('\t'),
            Keystroke::Char(c) => self.input.push(c),
            Keystroke::Ignored => {}
        }

        self.error_count = count_errors(&self.target, &self.input);
        self.check_completion(now);
    }

    fn check_completion(&mut self, now: SystemTime) {
        if self.input.len() >= self.target.len()
            && self.input[..self.target.len()] == self.target[..]
        {
            self.finished = true;
            self.ended_at = Some(now);
        }
    }

    pub fn stats(&self) -> LiveStats {
        self.stats_at(SystemTime::now())
    }

    /// Metrics anchored at `now` while running, at the end time once finished
    pub fn stats_at(&self, now: SystemTime) -> LiveStats {
        let Some(started_at) = self.started_at else {
            return LiveStats::default();
        };

        let end = self.ended_at.unwrap_or(now);
        let duration_secs = time_diff_secs(started_at, end).max(1.0);

        let correct_chars = self.target.len().saturating_sub(self.error_count) as f64;
        let wpm = (correct_chars / 5.0) / duration_secs * 60.0;

        let accuracy = if self.input.is_empty() {
            100.0
        } else {
            let correct_input = self.input.len().saturating_sub(self.error_count) as f64;
            correct_input / self.input.len() as f64 * 100.0
        };

        LiveStats {
            wpm,
            accuracy,
            duration_secs,
        }
    }
}
