//! Session-specific error types.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transcript already has a system preamble")]
    AlreadyPrimed,

    #[error("System preamble must come before any other entry")]
    PrimeAfterRecord,

    #[error("System entries can only be added with prime()")]
    SystemRecord,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
