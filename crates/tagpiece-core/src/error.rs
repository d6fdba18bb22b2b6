use thiserror::Error;

/// Errors that can occur while preparing NER data or running inference.
#[derive(Debug, Error)]
pub enum TagpieceError {
    /// A CoNLL data line did not carry the expected fields.
    #[error("malformed CoNLL line {line}: {content:?} (expected at least 4 fields)")]
    Format {
        /// 1-based line number in the input.
        line: usize,
        /// The offending line, without its terminator.
        content: String,
    },

    /// Parallel inputs disagree in count or length.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The tokenizer produced no subwords for a non-empty word.
    #[error("tokenizer produced no subwords for word {word:?}")]
    DegenerateTokenization {
        /// The word that could not be split.
        word: String,
    },

    /// Examples within one batch have different lengths.
    #[error("shape mismatch: expected length {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// A predicted index has no entry in the index-to-tag table.
    #[error("tag index {0} is not in the idx2tag table")]
    UnknownTagIndex(u32),

    /// The tokenizer backend failed or lacks a required token.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The model weights or configuration could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem failure, propagated unmodified.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Candle ML framework error.
    #[error("ML inference error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Result type alias for tagpiece operations.
pub type Result<T> = std::result::Result<T, TagpieceError>;
