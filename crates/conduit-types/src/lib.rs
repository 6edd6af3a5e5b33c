//! Shared types and error hierarchy for Conduit.

pub mod error;
pub mod message;
pub mod provider;
pub mod sse;
pub mod util;

pub use error::{ApiError, ConfigError};
pub use message::*;
pub use util::{preview, truncate_str};
