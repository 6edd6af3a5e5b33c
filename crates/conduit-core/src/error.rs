//! Error types for intent validation, dispatch, and model calls.

use conduit_mcp::McpError;
use conduit_types::ApiError;
use thiserror::Error;

/// Why an action did not produce a tool result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown action '{action}' (expected \"<endpoint>.<tool>\")")]
    UnknownAction { action: String },

    #[error("Unknown endpoint '{endpoint}'")]
    UnknownEndpoint { endpoint: String },

    #[error("Endpoint '{endpoint}' has no tool '{tool}'")]
    UnknownTool { endpoint: String, tool: String },

    #[error("Malformed arguments for '{target}': {message}")]
    MalformedArguments { target: String, message: String },

    #[error("Calling {endpoint}.{tool} failed: {source}")]
    Invocation {
        endpoint: String,
        tool: String,
        source: McpError,
    },

    #[error("Call to {endpoint}.{tool} was cancelled")]
    Cancelled { endpoint: String, tool: String },
}

impl DispatchError {
    /// True when the action was rejected before reaching any endpoint.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownAction { .. }
                | DispatchError::UnknownEndpoint { .. }
                | DispatchError::UnknownTool { .. }
                | DispatchError::MalformedArguments { .. }
        )
    }
}

/// A failed model call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model call cancelled")]
    Cancelled,
}
