//! Wire transports for MCP servers.
//!
//! Every transport offers the same request/notification contract; the
//! connector picks one per endpoint and handles fallback between them.

mod http;
mod sse;
mod stdio;

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

use crate::error::McpError;
use crate::jsonrpc::JsonRpcResponse;

/// Header carrying the Streamable HTTP session id.
pub(crate) const SESSION_HEADER: &str = "mcp-session-id";

/// A connected transport.
pub enum Transport {
    Stdio(StdioTransport),
    StreamableHttp(HttpTransport),
    Sse(SseTransport),
}

impl Transport {
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Stdio(_) => "stdio",
            Transport::StreamableHttp(_) => "streamable-http",
            Transport::Sse(_) => "sse",
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        match self {
            Transport::Stdio(t) => t.send_request(method, params).await,
            Transport::StreamableHttp(t) => t.send_request(method, params).await,
            Transport::Sse(t) => t.send_request(method, params).await,
        }
    }

    /// Send a JSON-RPC notification.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        match self {
            Transport::Stdio(t) => t.send_notification(method, params).await,
            Transport::StreamableHttp(t) => t.send_notification(method, params).await,
            Transport::Sse(t) => t.send_notification(method, params).await,
        }
    }

    /// Best-effort teardown.
    pub async fn shutdown(&self) {
        match self {
            Transport::Stdio(t) => t.shutdown().await,
            Transport::StreamableHttp(t) => t.shutdown().await,
            Transport::Sse(t) => t.shutdown(),
        }
    }
}

/// Append `bytes` to `partial` and take out the longest valid UTF-8 prefix.
/// An incomplete trailing sequence stays in `partial` for the next chunk.
pub(crate) fn take_utf8(partial: &mut Vec<u8>, bytes: &[u8]) -> String {
    partial.extend_from_slice(bytes);
    let valid = match std::str::from_utf8(&partial[..]) {
        Ok(text) => text.len(),
        Err(e) => e.valid_up_to(),
    };
    let text = String::from_utf8_lossy(&partial[..valid]).into_owned();
    partial.drain(..valid);
    text
}
