//! The demo tools.

use rand::Rng;
use serde_json::{Map, Value, json};

use crate::server::{DemoTool, ToolOutput};

pub fn get_random() -> DemoTool {
    DemoTool {
        name: "get-random",
        description: "Returns a random number between 1 and 9",
        input_schema: json!({"type": "object", "properties": {}}),
        run: run_get_random,
    }
}

fn run_get_random(_arguments: &Map<String, Value>) -> ToolOutput {
    Ok(rand::rng().random_range(1..=9).to_string())
}

pub fn add() -> DemoTool {
    DemoTool {
        name: "add",
        description: "Adds two numbers",
        input_schema: json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "First addend"},
                "b": {"type": "number", "description": "Second addend"}
            },
            "required": ["a", "b"]
        }),
        run: run_add,
    }
}

fn run_add(arguments: &Map<String, Value>) -> ToolOutput {
    let a = number(arguments, "a")?;
    let b = number(arguments, "b")?;
    let sum = a + b;
    // Whole sums print without a trailing ".0".
    if sum.fract() == 0.0 && sum.abs() < 1e15 {
        Ok(format!("{}", sum as i64))
    } else {
        Ok(sum.to_string())
    }
}

fn number(arguments: &Map<String, Value>, key: &str) -> Result<f64, String> {
    match arguments.get(key) {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| format!("Argument '{key}' must be a number, got {value}")),
        None => Err(format!("Missing required argument '{key}'")),
    }
}
