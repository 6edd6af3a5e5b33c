//! Turns an [`EndpointDescriptor`] into a [`LiveConnection`].

use crate::client::{McpClient, ToolHost};
use crate::config::{EndpointDescriptor, EndpointKind};
use crate::error::McpError;
use crate::registry::LiveConnection;
use crate::transport::{HttpTransport, SseTransport, StdioTransport, Transport};

/// Connect to one endpoint: open a transport, run the handshake, and fetch
/// the tool catalog.
///
/// A failing `tools/list` leaves the connection up with an empty catalog;
/// `/refresh` can fill it in later.
pub async fn connect(descriptor: &EndpointDescriptor) -> Result<LiveConnection, McpError> {
    let client = match &descriptor.kind {
        EndpointKind::Stdio(launch) => {
            let env = launch.resolve_env(&descriptor.name)?;
            let transport = StdioTransport::spawn(
                &launch.command,
                &launch.args,
                launch.cwd.as_deref(),
                &env,
                descriptor.timeout_ms,
            )?;
            McpClient::initialize(&descriptor.name, Transport::Stdio(transport)).await?
        }
        EndpointKind::Url { url } => {
            connect_url(&descriptor.name, url, descriptor.timeout_ms).await?
        }
    };

    let catalog = match client.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            tracing::warn!(
                "Tool discovery failed for '{}', continuing with an empty catalog: {e}",
                descriptor.name
            );
            Vec::new()
        }
    };

    tracing::info!(
        "MCP server '{}' connected over {} with {} tools",
        descriptor.name,
        client.transport_kind(),
        catalog.len()
    );
    Ok(LiveConnection::new(
        descriptor.clone(),
        Box::new(client),
        catalog,
    ))
}

/// Streamable HTTP first, legacy SSE on any failure.
async fn connect_url(name: &str, url: &str, timeout_ms: u64) -> Result<McpClient, McpError> {
    let primary = async {
        let transport = HttpTransport::new(url, timeout_ms)?;
        McpClient::initialize(name, Transport::StreamableHttp(transport)).await
    };
    let primary_err = match primary.await {
        Ok(client) => return Ok(client),
        Err(e) => e,
    };

    tracing::info!("Streamable HTTP failed for '{name}' ({primary_err}), trying SSE");
    let fallback = async {
        let transport = SseTransport::connect(url, timeout_ms).await?;
        McpClient::initialize(name, Transport::Sse(transport)).await
    };
    fallback.await.map_err(|fallback_err| McpError::Unreachable {
        endpoint: name.to_string(),
        primary: primary_err.to_string(),
        fallback: fallback_err.to_string(),
    })
}
