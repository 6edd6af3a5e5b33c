//! Anthropic Messages API client with SSE streaming for Conduit.

mod client;
mod retry;
mod stream;

pub use client::ApiClient;
pub use retry::RetryConfig;
pub use stream::MessageStream;
