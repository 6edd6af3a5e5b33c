//! MCP client: one server connection over any transport.
//!
//! Handles the protocol handshake (initialize + initialized notification),
//! tool discovery (tools/list), and tool invocation (tools/call).

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::error::McpError;
use crate::transport::Transport;

/// MCP protocol version we speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// A tool advertised by an MCP server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<serde_json::Value>,
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Render the result as text: text blocks joined by newlines, other
    /// blocks as a bracketed placeholder.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A content block in a tool result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "mimeType", default)]
        mime_type: String,
    },
    Audio {
        #[serde(rename = "mimeType", default)]
        mime_type: String,
    },
    Resource {
        #[serde(default)]
        resource: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl ToolContent {
    fn render(&self) -> String {
        match self {
            ToolContent::Text { text } => text.clone(),
            ToolContent::Image { mime_type } => format!("[image: {mime_type}]"),
            ToolContent::Audio { mime_type } => format!("[audio: {mime_type}]"),
            ToolContent::Resource { resource } => match resource.get("uri").and_then(|u| u.as_str()) {
                Some(uri) => format!("[resource: {uri}]"),
                None => "[resource]".to_string(),
            },
            ToolContent::Unknown => "[unsupported content]".to_string(),
        }
    }
}

/// Something that can list and call tools. Implemented by [`McpClient`];
/// tests substitute in-memory hosts.
pub trait ToolHost: Send + Sync {
    fn list_tools(&self)
    -> Pin<Box<dyn Future<Output = Result<Vec<ToolInfo>, McpError>> + Send + '_>>;

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, McpError>> + Send + 'a>>;

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    #[serde(default, rename = "serverInfo")]
    server_info: Option<ServerInfo>,
}

/// Client for a single MCP server.
pub struct McpClient {
    name: String,
    transport: Transport,
}

impl McpClient {
    /// Run the handshake over an already-open transport.
    pub async fn initialize(name: &str, transport: Transport) -> Result<Self, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "conduit",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = transport
            .send_request("initialize", Some(params))
            .await?
            .into_result(name)?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid initialize result: {e}")))?;

        if init.protocol_version != PROTOCOL_VERSION {
            tracing::debug!(
                "'{name}' negotiated protocol {} (we offered {PROTOCOL_VERSION})",
                init.protocol_version
            );
        }
        if let Some(info) = &init.server_info {
            tracing::debug!(
                "'{name}' is {} {}",
                info.name,
                info.version.as_deref().unwrap_or("")
            );
        }

        transport
            .send_notification("notifications/initialized", None)
            .await?;

        tracing::info!("MCP server '{name}' initialized over {}", transport.kind());
        Ok(Self {
            name: name.to_string(),
            transport,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    async fn fetch_tools(&self) -> Result<Vec<ToolInfo>, McpError> {
        let result = self
            .transport
            .send_request("tools/list", None)
            .await?
            .into_result(&self.name)?;
        let list: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid tools/list result: {e}")))?;
        Ok(list.tools)
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, McpError> {
        let params = serde_json::json!({
            "name": tool,
            "arguments": arguments,
        });
        let result = self
            .transport
            .send_request("tools/call", Some(params))
            .await?
            .into_result(&self.name)?;
        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid tools/call result: {e}")))
    }
}

impl ToolHost for McpClient {
    fn list_tools(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolInfo>, McpError>> + Send + '_>> {
        Box::pin(self.fetch_tools())
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, McpError>> + Send + 'a>> {
        Box::pin(self.invoke(name, arguments))
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.transport.shutdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_info_optional_fields() {
        let json = r#"{"name": "get-random"}"#;
        let tool: ToolInfo = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "get-random");
        assert!(tool.description.is_none());
        assert!(tool.input_schema.is_none());
    }

    #[test]
    fn tools_list_result() {
        let json = r#"{
            "tools": [
                {"name": "add", "description": "Add two numbers",
                 "inputSchema": {"type": "object", "properties": {"a": {"type": "number"}}}},
                {"name": "get-random"}
            ]
        }"#;
        let list: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(list.tools.len(), 2);
        assert_eq!(list.tools[0].description.as_deref(), Some("Add two numbers"));
        assert!(list.tools[0].input_schema.is_some());
    }

    #[test]
    fn call_result_text_joins_blocks() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ]
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), "first\n[image: image/png]\nsecond");
    }

    #[test]
    fn call_result_error_flag_and_unknown_blocks() {
        let json = r#"{
            "content": [
                {"type": "resource", "resource": {"uri": "file:///tmp/a.txt"}},
                {"type": "hologram"}
            ],
            "isError": true
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(result.is_error);
        assert_eq!(
            result.text(),
            "[resource: file:///tmp/a.txt]\n[unsupported content]"
        );
    }

    #[test]
    fn initialize_result_tolerates_missing_server_info() {
        let init: InitializeResult =
            serde_json::from_str(r#"{"protocolVersion": "2025-03-26", "capabilities": {}}"#)
                .unwrap();
        assert_eq!(init.protocol_version, "2025-03-26");
        assert!(init.server_info.is_none());
    }
}
