//! Conversation orchestration for Conduit: model output is parsed into tool
//! intents, dispatched to MCP endpoints, and folded back into the transcript.

pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod model;
pub mod preamble;

pub use conversation::{Conversation, TurnEvent, TurnOutcome};
pub use dispatch::dispatch;
pub use error::{DispatchError, ModelError};
pub use intent::{Intent, parse_arguments, parse_intents};
pub use model::ModelClient;
pub use preamble::build_preamble;
