//! Legacy HTTP+SSE transport.
//!
//! A `GET` opens a long-lived event stream. The server first sends an
//! `endpoint` event naming the URL to `POST` messages to; responses then
//! arrive on the stream as `message` events.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use conduit_types::sse::SseParser;
use futures_util::StreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use super::take_utf8;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

pub struct SseTransport {
    http: reqwest::Client,
    post_url: Url,
    next_id: AtomicU64,
    pending: Pending,
    closed: Arc<AtomicBool>,
    reader_handle: JoinHandle<()>,
    timeout_ms: u64,
}

impl SseTransport {
    /// Open the event stream and wait for the `endpoint` announcement.
    pub async fn connect(url: &str, timeout_ms: u64) -> Result<Self, McpError> {
        let base =
            Url::parse(url).map_err(|e| McpError::Protocol(format!("invalid URL {url}: {e}")))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::http(&base, e))?;
        let timeout = Duration::from_millis(timeout_ms);
        let timed_out = || McpError::Timeout {
            name: "sse connect".to_string(),
            timeout_ms,
        };

        let response = tokio::time::timeout(
            timeout,
            http.get(base.clone())
                .header(ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| McpError::http(&base, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::HttpStatus {
                url: base.to_string(),
                status: status.as_u16(),
            });
        }
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        if !is_event_stream {
            return Err(McpError::Protocol(format!(
                "{base} did not answer with an event stream"
            )));
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

        let closed = Arc::new(AtomicBool::new(false));
        let closed_for_reader = Arc::clone(&closed);
        let pending_for_reader = Arc::clone(&pending);
        let source = base.to_string();
        let reader_handle = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut parser = SseParser::new();
            let mut partial = Vec::new();
            let mut endpoint_tx = Some(endpoint_tx);

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!("Event stream from {source} failed: {e}");
                        break;
                    }
                };
                for event in parser.feed(&take_utf8(&mut partial, &bytes)) {
                    match event.event_type.as_deref() {
                        Some("endpoint") => {
                            if let Some(tx) = endpoint_tx.take() {
                                let _ = tx.send(event.data);
                            }
                        }
                        None | Some("message") => {
                            match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                                Ok(message) => {
                                    let Some(id) = message.response_id() else {
                                        continue;
                                    };
                                    if let Some(tx) = pending_for_reader.lock().await.remove(&id) {
                                        let _ = tx.send(message);
                                    }
                                }
                                Err(e) => tracing::warn!("Malformed event from {source}: {e}"),
                            }
                        }
                        Some(other) => tracing::debug!("Ignoring '{other}' event from {source}"),
                    }
                }
            }
            // Stream gone: no reply can arrive for anything pending or later.
            closed_for_reader.store(true, Ordering::SeqCst);
            pending_for_reader.lock().await.clear();
        });

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                reader_handle.abort();
                return Err(McpError::Protocol(
                    "event stream closed before announcing an endpoint".to_string(),
                ));
            }
            Err(_) => {
                reader_handle.abort();
                return Err(timed_out());
            }
        };

        let post_url = match base.join(endpoint.trim()) {
            Ok(u) => u,
            Err(e) => {
                reader_handle.abort();
                return Err(McpError::Protocol(format!(
                    "invalid endpoint '{endpoint}': {e}"
                )));
            }
        };
        tracing::debug!("SSE transport for {base} posts to {post_url}");

        Ok(Self {
            http,
            post_url,
            next_id: AtomicU64::new(1),
            pending,
            closed,
            reader_handle,
            timeout_ms,
        })
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::Protocol("event stream closed".to_string()));
        }
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(McpError::Protocol("event stream closed".to_string()));
        }

        let exchange = async {
            self.post(body).await?;
            rx.await.map_err(|_| {
                McpError::Protocol("event stream closed before responding".to_string())
            })
        };

        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), exchange).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => {
                self.pending.lock().await.remove(&id);
                Err(e)
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Timeout {
                    name: method.to_string(),
                    timeout_ms: self.timeout_ms,
                })
            }
        }
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
            })?
    }

    pub fn shutdown(&self) {
        self.reader_handle.abort();
    }

    async fn post(&self, body: String) -> Result<(), McpError> {
        let response = self
            .http
            .post(self.post_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::http(&self.post_url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::HttpStatus {
                url: self.post_url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}
