use include_dir::{include_dir, Dir};
use serde::Deserialize;

use crate::error::{KataError, Result};

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

/// Static token lists that lessons are assembled from
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Corpus {
    pub name: String,
    pub words: Vec<String>,
    #[serde(default)]
    pub bigrams: Vec<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub snippets: Vec<String>,
}

impl Corpus {
    /// Load one of the corpora bundled into the binary
    pub fn load(name: &str) -> Result<Self> {
        let file = LANG_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| KataError::UnknownLanguage(name.to_string()))?;

        let contents = file
            .contents_utf8()
            .ok_or_else(|| KataError::Corpus(format!("{name}.json is not valid utf-8")))?;

        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let corpus: Corpus = serde_json::from_str(json)?;
        if corpus.words.is_empty() {
            return Err(KataError::Corpus(format!("{} has no words", corpus.name)));
        }
        Ok(corpus)
    }

    /// Names of every bundled corpus, sorted
    pub fn available() -> Vec<String> {
        let mut names: Vec<String> = LANG_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|f| f.path().file_stem())
            .filter_map(|s| s.to_str())
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Words, then bigrams, then symbols
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.words
            .iter()
            .chain(self.bigrams.iter())
            .chain(self.symbols.iter())
            .map(String::as_str)
    }
}
