//! Error types for the chat line source.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("chat source unavailable: {0}")]
    Unavailable(String),

    #[error("chat command failed: {0}")]
    CommandFailed(String),

    #[error("chat command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("chat source io error: {0}")]
    Io(#[from] std::io::Error),
}
