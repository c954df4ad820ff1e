//! Error types for dwell-rank

use thiserror::Error;

/// Errors that can occur while parsing, ranking or encoding sessions
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Failed to parse page views: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Timestamp decreased at view {index}: {previous} -> {current}")]
    InvalidOrdering {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
