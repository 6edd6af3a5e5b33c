//! Transport-independent JSON-RPC handling for the demo servers.

use conduit_mcp::jsonrpc::JsonRpcError;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC "method not found"; also used for unknown tools.
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_REQUEST: i64 = -32600;
pub const PARSE_ERROR: i64 = -32700;

/// What a tool produced: text, and whether it is an error result.
pub type ToolOutput = Result<String, String>;

/// A tool the demo servers can expose.
pub struct DemoTool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub run: fn(&Map<String, Value>) -> ToolOutput,
}

pub struct DemoServer {
    name: &'static str,
    tools: Vec<DemoTool>,
}

#[derive(Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

impl DemoServer {
    pub fn new(name: &'static str, tools: Vec<DemoTool>) -> Self {
        Self { name, tools }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Handle one line of newline-delimited JSON-RPC.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        match serde_json::from_str(line) {
            Ok(message) => self.handle(message),
            Err(e) => Some(error(Value::Null, PARSE_ERROR, &e.to_string())),
        }
    }

    /// Handle one incoming message. Returns the response to send back, or
    /// `None` for notifications.
    pub fn handle(&self, message: Value) -> Option<Value> {
        let incoming: Incoming = match serde_json::from_value(message) {
            Ok(incoming) => incoming,
            Err(e) => {
                return Some(error(Value::Null, INVALID_REQUEST, &e.to_string()));
            }
        };
        // Requests carry an id; notifications need no answer.
        let id = incoming.id?;
        tracing::debug!("{}: {}", self.name, incoming.method);

        let response = match incoming.method.as_str() {
            "initialize" => result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": self.name, "version": env!("CARGO_PKG_VERSION")},
                }),
            ),
            "tools/list" => result(id, json!({"tools": self.list()})),
            "tools/call" => self.call(id, incoming.params.unwrap_or(Value::Null)),
            _ => error(id, METHOD_NOT_FOUND, "Method not found"),
        };
        Some(response)
    }

    fn list(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                })
            })
            .collect()
    }

    fn call(&self, id: Value, params: Value) -> Value {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        let Some(tool) = self.tools.iter().find(|t| t.name == name) else {
            return error(id, METHOD_NOT_FOUND, "Tool not found");
        };
        let empty = Map::new();
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let (text, is_error) = match (tool.run)(arguments) {
            Ok(text) => (text, false),
            Err(text) => (text, true),
        };
        result(
            id,
            json!({
                "content": [{"type": "text", "text": text}],
                "isError": is_error,
            }),
        )
    }
}

fn result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn error(id: Value, code: i64, message: &str) -> Value {
    let error = JsonRpcError {
        code,
        message: message.to_string(),
        data: None,
    };
    json!({"jsonrpc": "2.0", "id": id, "error": error})
}
