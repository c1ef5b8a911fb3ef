use thiserror::Error;

/// Errors surfaced by the practice core.
#[derive(Debug, Error)]
pub enum KataError {
    #[error("statistics store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("target text is empty or whitespace only")]
    EmptyTarget,

    #[error("unknown corpus language: {0}")]
    UnknownLanguage(String),

    #[error("corpus is malformed: {0}")]
    Corpus(String),
}

pub type Result<T> = std::result::Result<T, KataError>;
