use thiserror::Error;

pub type Result<T> = std::result::Result<T, CanvasSearchError>;

/// Stable external key of a canvas
pub type CanvasId = i64;

/// Identifier of the user owning or requesting a canvas
pub type UserId = i64;

#[derive(Error, Debug)]
pub enum CanvasSearchError {
    #[error("No search index available")]
    NoIndex,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Inconsistent index state: {0}")]
    InconsistentState(String),

    #[error("Timed out during {operation}")]
    Timeout { operation: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod content;
pub mod embeddings;
pub mod index;
pub mod response;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;
