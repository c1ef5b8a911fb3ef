use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::Path;

use crate::corpus::Corpus;
use crate::error::Result;
use crate::stats::KeyStat;

/// Below this many candidate tokens a weakness lesson is padded with the full corpus
pub const MIN_POOL_SIZE: usize = 5;

/// A character to bias a lesson towards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakKey {
    pub key: char,
    pub error_rate: f64,
}

/// Convert ledger rows into weak keys, skipping rows without attempts
pub fn weak_keys_from(stats: &[KeyStat]) -> Vec<WeakKey> {
    stats
        .iter()
        .filter(|s| s.attempts() > 0)
        .map(|s| WeakKey {
            key: s.key,
            error_rate: s.error_rate(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LessonKind {
    Bigrams,
    Words,
    Symbols,
    Code,
    Weaknesses,
}

/// Produces practice text from a corpus
#[derive(Debug)]
pub struct LessonGenerator {
    rng: StdRng,
}

impl Default for LessonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible lessons
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Plain lesson of the given kind. Weakness lessons need ledger data, so
    /// without it they degrade to a vocabulary lesson.
    pub fn generate(&mut self, kind: LessonKind, corpus: &Corpus, length: usize) -> String {
        match kind {
            LessonKind::Bigrams => self.from_list(&corpus.bigrams, &corpus.words, length, " "),
            LessonKind::Symbols => self.from_list(&corpus.symbols, &corpus.words, length, " "),
            LessonKind::Code => self.code(corpus, length),
            LessonKind::Words | LessonKind::Weaknesses => {
                self.from_list(&corpus.words, &corpus.words, length, " ")
            }
        }
    }

    /// Lesson biased towards `weak_keys`.
    ///
    /// Tokens containing any weak key (case-sensitive) form the pool; a pool
    /// smaller than [`MIN_POOL_SIZE`] is padded with the whole corpus.
    pub fn weakness_lesson(&mut self, weak_keys: &[WeakKey], corpus: &Corpus, length: usize) -> String {
        if weak_keys.is_empty() {
            tracing::debug!("no weak keys, generating vocabulary lesson");
            return self.generate(LessonKind::Words, corpus, length);
        }

        let pool = candidate_pool(weak_keys, corpus);

        (0..length)
            .filter_map(|_| pool.choose(&mut self.rng).copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn from_list(&mut self, list: &[String], fallback: &[String], length: usize, sep: &str) -> String {
        let list = if list.is_empty() { fallback } else { list };
        (0..length)
            .filter_map(|_| list.choose(&mut self.rng))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn code(&mut self, corpus: &Corpus, count: usize) -> String {
        if corpus.snippets.is_empty() {
            return self.from_list(&corpus.words, &corpus.words, count * 5, " ");
        }
        (0..count.min(corpus.snippets.len()))
            .filter_map(|_| corpus.snippets.choose(&mut self.rng))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Corpus tokens containing any weak key, de-duplicated in first-seen order.
/// Padded with the whole corpus when fewer than [`MIN_POOL_SIZE`] match.
pub fn candidate_pool<'a>(weak_keys: &[WeakKey], corpus: &'a Corpus) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut pool = Vec::new();
    for weak in weak_keys {
        for token in corpus.tokens().filter(|t| t.contains(weak.key)) {
            if seen.insert(token) {
                pool.push(token);
            }
        }
    }

    if pool.len() < MIN_POOL_SIZE {
        tracing::debug!(pool = pool.len(), "weakness pool too small, adding full corpus");
        for token in corpus.tokens() {
            if seen.insert(token) {
                pool.push(token);
            }
        }
    }

    pool
}

/// Use a file's contents as the lesson text
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use clap::ValueEnum;

    fn corpus() -> Corpus {
        Corpus {
            name: "test".into(),
            words: ["func", "return", "range", "map", "nil", "go", "var"]
                .map(String::from)
                .to_vec(),
            bigrams: ["fu", "re", "ma"].map(String::from).to_vec(),
            symbols: ["{}", ":=", "!="].map(String::from).to_vec(),
            snippets: vec!["a := 1".into(), "b := 2".into()],
        }
    }

    fn weak(keys: &str) -> Vec<WeakKey> {
        keys.chars()
            .map(|key| WeakKey {
                key,
                error_rate: 0.5,
            })
            .collect()
    }

    #[test]
    fn test_lesson_kind_parse() {
        assert_eq!(LessonKind::from_str("bigrams", false).unwrap(), LessonKind::Bigrams);
        assert_eq!(LessonKind::from_str("Code", true).unwrap(), LessonKind::Code);
        assert_eq!(LessonKind::Weaknesses.to_string(), "weaknesses");
        assert!(LessonKind::from_str("poetry", true).is_err());
    }

    #[test]
    fn test_generate_word_lesson() {
        let mut gen = LessonGenerator::seeded(7);
        let corpus = corpus();
        let lesson = gen.generate(LessonKind::Words, &corpus, 12);

        let tokens: Vec<&str> = lesson.split(' ').collect();
        assert_eq!(tokens.len(), 12);
        assert!(tokens.iter().all(|t| corpus.words.iter().any(|w| w == t)));
    }

    #[test]
    fn test_generate_code_joins_with_blank_line() {
        let mut gen = LessonGenerator::seeded(1);
        let lesson = gen.generate(LessonKind::Code, &corpus(), 2);
        assert_eq!(lesson.matches("\n\n").count(), 1);
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let a = LessonGenerator::seeded(99).generate(LessonKind::Symbols, &corpus(), 8);
        let b = LessonGenerator::seeded(99).generate(LessonKind::Symbols, &corpus(), 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_candidate_pool_dedups_in_order() {
        let corpus = corpus();
        let pool = candidate_pool(&weak("rn"), &corpus);
        assert_eq!(pool, vec!["return", "range", "var", "re", "func", "nil"]);
    }

    #[test]
    fn test_small_pool_is_padded_with_corpus() {
        let corpus = corpus();
        let pool = candidate_pool(&weak("ma"), &corpus);

        assert_eq!(&pool[..4], &["map", "ma", "range", "var"]);
        assert_eq!(pool.len(), corpus.tokens().count());
    }

    #[test]
    fn test_weakness_lesson_large_pool_stays_focused() {
        let mut gen = LessonGenerator::seeded(11);
        let lesson = gen.weakness_lesson(&weak("rn"), &corpus(), 50);

        assert_eq!(lesson.split(' ').count(), 50);
        for token in lesson.split(' ') {
            assert!(
                token.contains('r') || token.contains('n'),
                "{token} does not contain a weak key"
            );
        }
    }

    #[test]
    fn test_candidate_pool_is_case_sensitive() {
        let corpus = Corpus {
            name: "case".into(),
            words: ["Alpha", "Beta", "Gamma", "Delta", "Echo", "Zeta", "alpha", "Ant", "Ape", "Arc"]
                .map(String::from)
                .to_vec(),
            bigrams: vec![],
            symbols: vec![],
            snippets: vec![],
        };

        let pool = candidate_pool(&weak("A"), &corpus);
        assert_eq!(
            pool,
            vec!["Alpha", "Ant", "Ape", "Arc", "Beta", "Gamma", "Delta", "Echo", "Zeta", "alpha"]
        );
    }

    #[test]
    fn test_weakness_lesson_without_keys_is_vocabulary() {
        let mut gen = LessonGenerator::seeded(2);
        let corpus = corpus();
        let lesson = gen.weakness_lesson(&[], &corpus, 10);

        assert!(lesson
            .split(' ')
            .all(|t| corpus.words.iter().any(|w| w == t)));
    }

    #[test]
    fn test_weakness_lesson_zero_length() {
        let mut gen = LessonGenerator::seeded(2);
        assert_eq!(gen.weakness_lesson(&weak("r"), &corpus(), 0), "");
    }

    #[test]
    fn test_weak_keys_from_stats() {
        let now = Local::now();
        let mut seen = KeyStat::new('x', now);
        seen.errors = 3;
        seen.successes = 1;
        let unseen = KeyStat::new('y', now);

        let weak = weak_keys_from(&[seen, unseen]);
        assert_eq!(weak, vec![WeakKey { key: 'x', error_rate: 0.75 }]);
    }

    #[test]
    fn test_from_file_trims_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson.txt");
        std::fs::write(&path, "fn main() {}\n\n").unwrap();

        assert_eq!(from_file(&path).unwrap(), "fn main() {}");
        assert!(from_file(dir.path().join("missing.txt")).is_err());
    }
}
