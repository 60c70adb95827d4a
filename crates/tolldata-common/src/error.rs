//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for tolldata operations
pub type Result<T> = std::result::Result<T, TollDataError>;

/// Workspace-wide error taxonomy.
///
/// Component-local errors (fetch, records, db) convert into this at the
/// boundaries where callers no longer care which component failed.
#[derive(Error, Debug)]
pub enum TollDataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TollDataError {
    /// Configuration error with a message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
