//! MCP (Model Context Protocol) client for Conduit.
//!
//! Endpoints are read from a JSON array of descriptors. Each one is reached
//! over stdio (a spawned child speaking newline-delimited JSON-RPC 2.0) or
//! over HTTP, where Streamable HTTP is tried first and the legacy HTTP+SSE
//! transport is the fallback. After the `initialize` handshake the tool
//! catalog is fetched and the connection is kept in a [`ServerRegistry`].

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod jsonrpc;
pub mod registry;
mod transport;

pub use client::{McpClient, ToolCallResult, ToolContent, ToolHost, ToolInfo};
pub use config::{EndpointDescriptor, EndpointKind, StdioLaunch, load_endpoints, parse_endpoints};
pub use connector::connect;
pub use error::McpError;
pub use registry::{ConnectFailure, LiveConnection, ServerRegistry};
