//! Extracting tool intents from free-form model output.
//!
//! The model is asked to emit one JSON object per line:
//! `{"action":"<endpoint>.<tool>","args":{...}}`. Everything else is prose.

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// A request to call `tool` on `endpoint` with `arguments`.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub endpoint: String,
    pub tool: String,
    pub arguments: Map<String, Value>,
}

impl Intent {
    pub fn new(endpoint: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tool: tool.into(),
            arguments: Map::new(),
        }
    }

    pub fn target(&self) -> String {
        format!("{}.{}", self.endpoint, self.tool)
    }
}

/// Parse every action line in `output`, in emission order.
///
/// Lines that are not JSON objects with a string `action` are prose and are
/// skipped. An empty result means the output is a direct answer.
pub fn parse_intents(output: &str) -> Vec<Result<Intent, DispatchError>> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Result<Intent, DispatchError>> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(line) else {
        return None;
    };
    let Some(Value::String(action)) = object.remove("action") else {
        return None;
    };

    let Some((endpoint, tool)) = split_target(&action) else {
        return Some(Err(DispatchError::UnknownAction { action }));
    };

    let arguments = match object.remove("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Some(Err(DispatchError::MalformedArguments {
                target: action,
                message: format!("args must be an object, got {}", kind_of(&other)),
            }));
        }
    };

    Some(Ok(Intent {
        endpoint: endpoint.to_string(),
        tool: tool.to_string(),
        arguments,
    }))
}

/// Split on the first `.`; both halves must be non-empty.
fn split_target(action: &str) -> Option<(&str, &str)> {
    let (endpoint, tool) = action.split_once('.')?;
    if endpoint.trim().is_empty() || tool.trim().is_empty() {
        return None;
    }
    Some((endpoint, tool))
}

/// Parse the JSON argument text of a direct call. Missing or blank means `{}`.
pub fn parse_arguments(target: &str, raw: Option<&str>) -> Result<Map<String, Value>, DispatchError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(Map::new()),
        Some(raw) => raw,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DispatchError::MalformedArguments {
            target: target.to_string(),
            message: format!("expected a JSON object, got {}", kind_of(&other)),
        }),
        Err(e) => Err(DispatchError::MalformedArguments {
            target: target.to_string(),
            message: e.to_string(),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
