//! The system preamble that tells the model which tools exist and how to
//! ask for them.

use std::fmt::Write;

use conduit_mcp::{ServerRegistry, ToolInfo};

const INTRO: &str = "You are an assistant that can use tools exposed by MCP servers.";

const INSTRUCTIONS: &str = "\
When a tool is needed, reply ONLY with exactly one JSON object per line, in this shape:
{\"action\":\"<server>.<tool>\",\"args\":{...}}
Use server, tool and argument names exactly as listed above. You may emit several lines to call several tools.
When no tool is needed, answer the user directly in plain text.";

/// Build the preamble from every registered endpoint's catalog.
pub fn build_preamble(registry: &ServerRegistry) -> String {
    let mut out = String::new();
    out.push_str(INTRO);
    out.push_str("\n\nAvailable servers and tools:\n");

    if registry.is_empty() {
        out.push_str("(none)\n");
    }
    for connection in registry.connections() {
        let _ = writeln!(out, "- {}:", connection.name());
        if connection.tools().is_empty() {
            out.push_str("  (no tools discovered)\n");
        }
        for tool in connection.tools() {
            out.push_str(&describe_tool(tool));
        }
    }

    out.push('\n');
    out.push_str(INSTRUCTIONS);
    out
}

fn describe_tool(tool: &ToolInfo) -> String {
    let mut line = format!("  - {}", tool.name);
    if let Some(description) = tool.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = write!(line, ": {}", description.trim());
    }
    let args = argument_names(tool);
    if !args.is_empty() {
        let _ = write!(line, " (args: {})", args.join(", "));
    }
    line.push('\n');
    line
}

fn argument_names(tool: &ToolInfo) -> Vec<&str> {
    tool.input_schema
        .as_ref()
        .and_then(|schema| schema.get("properties"))
        .and_then(|props| props.as_object())
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
