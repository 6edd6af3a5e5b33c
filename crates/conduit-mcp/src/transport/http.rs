//! Streamable HTTP transport: every JSON-RPC message is a `POST`, and the
//! server answers with either `application/json` or a `text/event-stream`
//! carrying the response.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use conduit_types::sse::SseParser;
use futures_util::StreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::{SESSION_HEADER, take_utf8};
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(url: &str, timeout_ms: u64) -> Result<Self, McpError> {
        let url = Url::parse(url).map_err(|e| McpError::Protocol(format!("invalid URL {url}: {e}")))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::http(&url, e))?;
        Ok(Self {
            http,
            url,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
            timeout_ms,
        })
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|s| s.clone())
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        tokio::time::timeout(Duration::from_millis(self.timeout_ms), self.exchange(&request))
            .await
            .map_err(|_| McpError::Timeout {
                name: method.to_string(),
                timeout_ms: self.timeout_ms,
            })?
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        tokio::time::timeout(Duration::from_millis(self.timeout_ms), self.post(body))
            .await
            .map_err(|_| McpError::Timeout {
                name: method.to_string(),
                timeout_ms: self.timeout_ms,
            })??;
        Ok(())
    }

    /// Ask the server to drop the session, if one was issued.
    pub async fn shutdown(&self) {
        let Some(session) = self.session_id() else {
            return;
        };
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            self.http
                .delete(self.url.clone())
                .header(SESSION_HEADER, session)
                .send(),
        )
        .await;
        if let Ok(Err(e)) = result {
            tracing::debug!("Session teardown for {} failed: {e}", self.url);
        }
    }

    async fn post(&self, body: String) -> Result<reqwest::Response, McpError> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .body(body);
        if let Some(session) = self.session_id() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await.map_err(|e| McpError::http(&self.url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::HttpStatus {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut slot) = self.session_id.lock() {
                *slot = Some(session.to_string());
            }
        }
        Ok(response)
    }

    async fn exchange(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let response = self.post(serde_json::to_string(request)?).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_event_stream {
            return self.read_event_stream(response, request.id).await;
        }

        let body = response
            .text()
            .await
            .map_err(|e| McpError::http(&self.url, e))?;
        let message: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| McpError::Protocol(format!("invalid JSON-RPC response: {e}")))?;
        if message.response_id() != Some(request.id) {
            return Err(McpError::Protocol(format!(
                "expected response to request {}, got {:?}",
                request.id, message.id
            )));
        }
        Ok(message)
    }

    /// Read SSE events until the one answering `id` arrives.
    async fn read_event_stream(
        &self,
        response: reqwest::Response,
        id: u64,
    ) -> Result<JsonRpcResponse, McpError> {
        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();
        let mut partial = Vec::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| McpError::http(&self.url, e))?;
            for event in parser.feed(&take_utf8(&mut partial, &bytes)) {
                if !matches!(event.event_type.as_deref(), None | Some("message")) {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                    Ok(message) if message.response_id() == Some(id) => return Ok(message),
                    Ok(message) => {
                        tracing::debug!("Skipping unrelated message {:?}", message.method)
                    }
                    Err(e) => tracing::warn!("Malformed event from {}: {e}", self.url),
                }
            }
        }

        Err(McpError::Protocol(
            "event stream ended before the response arrived".to_string(),
        ))
    }
}
