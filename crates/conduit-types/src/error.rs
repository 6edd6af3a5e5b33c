//! Error hierarchy for Conduit.

use thiserror::Error;

/// Errors from the model provider (the Anthropic Messages API).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server overloaded")]
    Overloaded,

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream parse error: {0}")]
    StreamParse(String),

    #[error("Error event in stream ({error_type}): {message}")]
    Stream { error_type: String, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Model returned no text content")]
    EmptyResponse,
}

/// Errors from configuration loading. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("No endpoints defined in {path}")]
    NoEndpoints { path: String },

    #[error("Endpoint '{name}' is defined more than once")]
    DuplicateEndpoint { name: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
