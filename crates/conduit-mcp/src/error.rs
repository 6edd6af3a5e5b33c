//! Error types for MCP operations.

use thiserror::Error;

/// Errors from connecting to or talking with an MCP endpoint.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Environment variable '{name}' is missing for endpoint '{endpoint}'")]
    MissingEnvironment { name: String, endpoint: String },

    #[error("Failed to spawn MCP server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Endpoint '{endpoint}' unreachable (streamable HTTP: {primary}; SSE: {fallback})")]
    Unreachable {
        endpoint: String,
        primary: String,
        fallback: String,
    },

    #[error("Endpoint '{name}' is not registered")]
    UnknownEndpoint { name: String },

    #[error("Endpoint '{name}' is already registered")]
    DuplicateEndpoint { name: String },

    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP request '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// A failed reqwest call. Request deadlines are enforced around each
    /// exchange and surface as [`McpError::Timeout`], never through here.
    pub(crate) fn http(url: &impl ToString, err: reqwest::Error) -> Self {
        McpError::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
