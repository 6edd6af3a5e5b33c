//! Validating an [`Intent`] against the registry and invoking the tool.

use conduit_mcp::{McpError, ServerRegistry};
use conduit_session::{ChatLog, LogKind};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::intent::Intent;

/// Validate and run one intent, returning the raw result text.
///
/// Checks run in order and stop at the first failure: the endpoint must be
/// registered, then the tool must be in its current catalog. Only then is
/// the endpoint contacted. Every invocation (successful or not) is written
/// to `log` as an `mcp_call` entry.
pub async fn dispatch(
    registry: &ServerRegistry,
    log: &ChatLog,
    intent: &Intent,
    cancel: &CancellationToken,
) -> Result<String, DispatchError> {
    let connection =
        registry
            .lookup(&intent.endpoint)
            .ok_or_else(|| DispatchError::UnknownEndpoint {
                endpoint: intent.endpoint.clone(),
            })?;
    if !connection.has_tool(&intent.tool) {
        return Err(DispatchError::UnknownTool {
            endpoint: intent.endpoint.clone(),
            tool: intent.tool.clone(),
        });
    }

    tracing::debug!("Calling {} with {:?}", intent.target(), intent.arguments);
    let arguments = Value::Object(intent.arguments.clone());
    let call = connection.host().call_tool(&intent.tool, arguments.clone());

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(DispatchError::Cancelled {
            endpoint: intent.endpoint.clone(),
            tool: intent.tool.clone(),
        }),
        result = call => match result {
            Ok(result) if result.is_error => Err(invocation(intent, McpError::ToolFailed {
                tool: intent.tool.clone(),
                message: result.text(),
            })),
            Ok(result) => Ok(result.text()),
            Err(e) => Err(invocation(intent, e)),
        },
    };

    let (result, error) = match &outcome {
        Ok(text) => (Some(text.clone()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let entry = LogKind::McpCall {
        endpoint: intent.endpoint.clone(),
        tool: intent.tool.clone(),
        args: arguments,
        result,
        error,
    };
    if let Err(e) = log.append(entry).await {
        tracing::warn!("Failed to write chat log: {e}");
    }

    outcome
}

fn invocation(intent: &Intent, source: McpError) -> DispatchError {
    DispatchError::Invocation {
        endpoint: intent.endpoint.clone(),
        tool: intent.tool.clone(),
        source,
    }
}
