//! SM-2 spaced repetition over the per-character ledger.
//!
//! A review "passes" at quality 3 or better. Intervals are in days and the
//! ease factor never drops below [`MIN_EASE_FACTOR`].

use chrono::{DateTime, Local};
use itertools::Itertools;
use std::cmp::Ordering;

use crate::stats::KeyStat;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_QUALITY: i32 = 5;
pub const PASSING_QUALITY: i32 = 3;

/// Attempts a character needs before it can be scheduled for review
pub const MIN_ATTEMPTS_DUE: u64 = 3;
/// Attempts a character needs before its error rate is trusted
pub const MIN_ATTEMPTS_WEAKEST: u64 = 5;

impl KeyStat {
    /// Apply one SM-2 review with the given quality (clamped to 0..=5)
    pub fn update_sm2(&mut self, quality: i32, now: DateTime<Local>) {
        let quality = quality.clamp(0, MAX_QUALITY);

        if quality >= PASSING_QUALITY {
            self.interval = match self.repetitions {
                0 => 1,
                1 => 6,
                _ => (self.interval as f64 * self.ease_factor).round() as u32,
            };
            self.repetitions += 1;
        } else {
            self.repetitions = 0;
            self.interval = 1;
        }

        let miss = (MAX_QUALITY - quality) as f64;
        self.ease_factor += 0.1 - miss * (0.08 + miss * 0.02);
        if self.ease_factor < MIN_EASE_FACTOR {
            self.ease_factor = MIN_EASE_FACTOR;
        }

        self.last_practiced = now;
    }

    /// Fractional days elapsed since this character was last practiced
    pub fn days_since_practiced(&self, now: DateTime<Local>) -> f64 {
        (now - self.last_practiced).num_milliseconds() as f64 / 86_400_000.0
    }

    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.days_since_practiced(now) >= self.interval as f64
    }
}

/// Map a 0–100 accuracy to an SM-2 quality score.
///
/// ≥95 → 5, ≥85 → 4, ≥70 → 3, ≥50 → 2, ≥30 → 1, otherwise 0.
pub fn quality_for(accuracy: f64) -> i32 {
    match accuracy {
        a if a >= 95.0 => 5,
        a if a >= 85.0 => 4,
        a if a >= 70.0 => 3,
        a if a >= 50.0 => 2,
        a if a >= 30.0 => 1,
        _ => 0,
    }
}

/// Rows whose review interval has elapsed, stalest first
pub fn select_due(ledger: &[KeyStat], now: DateTime<Local>, limit: usize) -> Vec<KeyStat> {
    ledger
        .iter()
        .filter(|stat| stat.attempts() >= MIN_ATTEMPTS_DUE && stat.is_due(now))
        .sorted_by(|a, b| {
            a.last_practiced
                .cmp(&b.last_practiced)
                .then_with(|| a.key.cmp(&b.key))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// Rows with the highest error rate; ties broken by character
pub fn select_weakest(ledger: &[KeyStat], limit: usize) -> Vec<KeyStat> {
    ledger
        .iter()
        .filter(|stat| stat.attempts() >= MIN_ATTEMPTS_WEAKEST)
        .sorted_by(|a, b| {
            b.error_rate()
                .partial_cmp(&a.error_rate())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        })
        .take(limit)
        .cloned()
        .collect()
}
