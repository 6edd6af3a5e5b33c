//! Conversation transcript and chat log for Conduit.

pub mod error;
pub mod log;
pub mod transcript;

pub use error::SessionError;
pub use log::{ChatLog, LogEntry, LogKind};
pub use transcript::{Entry, Role, Transcript};
