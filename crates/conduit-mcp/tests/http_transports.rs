//! Connector tests against in-process axum MCP servers: Streamable HTTP with
//! JSON and event-stream replies, degraded discovery, and the legacy
//! HTTP+SSE fallback.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use conduit_mcp::{EndpointDescriptor, EndpointKind, McpError, ServerRegistry, connect};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};

const SESSION: &str = "session-1";

/// The result for a request, `None` for notifications.
fn answer(request: &Value) -> Option<Value> {
    let id = request.get("id")?.clone();
    let method = request["method"].as_str().unwrap_or_default();
    let body = match method {
        "initialize" => json!({"result": {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "echo-server", "version": "0.0.1"}
        }}),
        "tools/list" => json!({"result": {"tools": [
            {"name": "echo", "description": "Echo the text argument"}
        ]}}),
        "tools/call" if request["params"]["name"] != "echo" => {
            json!({"error": {"code": -32602, "message": "Unknown tool"}})
        }
        "tools/call" => {
            let text = request["params"]["arguments"]["text"]
                .as_str()
                .unwrap_or_default();
            json!({"result": {"content": [{"type": "text", "text": text}]}})
        }
        _ => json!({"error": {"code": -32601, "message": "Method not found"}}),
    };
    let mut message = json!({"jsonrpc": "2.0", "id": id});
    let (Some(target), Some(extra)) = (message.as_object_mut(), body.as_object()) else {
        return None;
    };
    target.extend(extra.clone());
    Some(message)
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn descriptor(url: &str) -> EndpointDescriptor {
    EndpointDescriptor {
        name: "echo".to_string(),
        kind: EndpointKind::Url {
            url: url.to_string(),
        },
        timeout_ms: 5000,
    }
}

// ---------------------------------------------------------------------------
// Streamable HTTP
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StreamableState {
    reply_with_event_stream: bool,
    fail_tools_list: AtomicBool,
    missing_session: AtomicBool,
    requests: AtomicUsize,
}

async fn streamable(
    State(state): State<Arc<StreamableState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let is_initialize = request["method"] == "initialize";
    if !is_initialize
        && headers.get("mcp-session-id").and_then(|v| v.to_str().ok()) != Some(SESSION)
    {
        state.missing_session.store(true, Ordering::SeqCst);
    }

    if request["method"] == "tools/list" && state.fail_tools_list.load(Ordering::SeqCst) {
        return axum::Json(json!({
            "jsonrpc": "2.0",
            "id": request["id"].clone(),
            "error": {"code": -32603, "message": "catalog unavailable"}
        }))
        .into_response();
    }

    let Some(reply) = answer(&request) else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut response = if state.reply_with_event_stream {
        let body = format!(
            ": keep-alive\n\nevent: message\ndata: {{\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}}\n\nevent: message\ndata: {reply}\n\n"
        );
        ([(CONTENT_TYPE, "text/event-stream")], body).into_response()
    } else {
        axum::Json(reply).into_response()
    };
    if is_initialize {
        response
            .headers_mut()
            .insert("mcp-session-id", SESSION.parse().unwrap());
    }
    response
}

async fn streamable_server(reply_with_event_stream: bool) -> (String, Arc<StreamableState>) {
    serve_streamable(StreamableState {
        reply_with_event_stream,
        ..Default::default()
    })
    .await
}

async fn serve_streamable(state: StreamableState) -> (String, Arc<StreamableState>) {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/", post(streamable))
        .with_state(Arc::clone(&state));
    (serve(app).await, state)
}

#[tokio::test]
async fn streamable_http_json_replies() {
    let (url, state) = streamable_server(false).await;

    let conn = connect(&descriptor(&url)).await.unwrap();
    assert_eq!(conn.tools().len(), 1);
    assert_eq!(conn.tools()[0].name, "echo");

    let result = conn
        .host()
        .call_tool("echo", json!({"text": "hola"}))
        .await
        .unwrap();
    assert_eq!(result.text(), "hola");
    assert!(!result.is_error);

    // initialize, initialized, tools/list, tools/call
    assert_eq!(state.requests.load(Ordering::SeqCst), 4);
    assert!(!state.missing_session.load(Ordering::SeqCst));
}

#[tokio::test]
async fn streamable_http_event_stream_replies() {
    let (url, state) = streamable_server(true).await;

    let conn = connect(&descriptor(&url)).await.unwrap();
    let result = conn
        .host()
        .call_tool("echo", json!({"text": "from the stream"}))
        .await
        .unwrap();
    assert_eq!(result.text(), "from the stream");
    assert!(!state.missing_session.load(Ordering::SeqCst));
}

#[tokio::test]
async fn jsonrpc_error_from_tool_call() {
    let (url, _state) = streamable_server(false).await;
    let conn = connect(&descriptor(&url)).await.unwrap();

    match conn.host().call_tool("shout", json!({})).await {
        Err(McpError::JsonRpc { server, code, .. }) => {
            assert_eq!(server, "echo");
            assert_eq!(code, -32602);
        }
        other => panic!("Expected JsonRpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn refresh_requeries_catalog_over_http() {
    let (url, state) = streamable_server(false).await;
    let mut registry = ServerRegistry::new();
    registry.insert(connect(&descriptor(&url)).await.unwrap()).unwrap();
    let before = state.requests.load(Ordering::SeqCst);

    assert_eq!(registry.refresh("echo").await.unwrap(), 1);
    assert_eq!(state.requests.load(Ordering::SeqCst), before + 1);
    registry.shutdown().await;
}

#[tokio::test]
async fn failed_discovery_keeps_endpoint_with_empty_catalog() {
    let (url, state) = serve_streamable(StreamableState {
        fail_tools_list: AtomicBool::new(true),
        ..Default::default()
    })
    .await;

    let (mut registry, failures) = ServerRegistry::connect_all(&[descriptor(&url)]).await;
    assert!(failures.is_empty());
    assert_eq!(registry.list(), ["echo"]);
    assert_eq!(registry.tools_of("echo").map(|t| t.len()), Some(0));

    state.fail_tools_list.store(false, Ordering::SeqCst);
    assert_eq!(registry.refresh("echo").await.unwrap(), 1);
    let tools = registry.tools_of("echo").unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "echo");
    registry.shutdown().await;
}

// ---------------------------------------------------------------------------
// Legacy HTTP+SSE
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LegacyState {
    stream: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    posts: AtomicUsize,
}

async fn legacy_stream(
    State(state): State<Arc<LegacyState>>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(
        Event::default()
            .event("endpoint")
            .data("/messages?sessionId=abc"),
    );
    *state.stream.lock().await = Some(tx);

    let events = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });
    Sse::new(events)
}

async fn legacy_post(State(state): State<Arc<LegacyState>>, body: String) -> StatusCode {
    state.posts.fetch_add(1, Ordering::SeqCst);
    let Ok(request) = serde_json::from_str::<Value>(&body) else {
        return StatusCode::BAD_REQUEST;
    };
    if let Some(reply) = answer(&request) {
        if let Some(tx) = state.stream.lock().await.as_ref() {
            let _ = tx.send(Event::default().event("message").data(reply.to_string()));
        }
    }
    StatusCode::ACCEPTED
}

async fn legacy_server() -> (String, Arc<LegacyState>) {
    let state = Arc::new(LegacyState::default());
    // `/` only answers GET, so the Streamable HTTP POST gets 405.
    let app = Router::new()
        .route("/", get(legacy_stream))
        .route("/messages", post(legacy_post))
        .with_state(Arc::clone(&state));
    (serve(app).await, state)
}

#[tokio::test]
async fn falls_back_to_legacy_sse() {
    let (url, state) = legacy_server().await;

    let conn = connect(&descriptor(&url)).await.unwrap();
    assert_eq!(conn.tools()[0].name, "echo");

    let result = conn
        .host()
        .call_tool("echo", json!({"text": "legacy"}))
        .await
        .unwrap();
    assert_eq!(result.text(), "legacy");

    // initialize, initialized, tools/list, tools/call
    assert_eq!(state.posts.load(Ordering::SeqCst), 4);
    conn.host().shutdown().await;
}

#[tokio::test]
async fn closed_event_stream_fails_fast() {
    let (url, state) = legacy_server().await;
    let conn = connect(&descriptor(&url)).await.unwrap();
    assert_eq!(conn.tools().len(), 1);

    // Dropping the sender ends the server's event stream.
    *state.stream.lock().await = None;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        conn.host().call_tool("echo", json!({"text": "anyone?"})),
    )
    .await
    .expect("call should fail without waiting for the request timeout");
    match outcome {
        Err(McpError::Protocol(message)) => assert!(message.contains("event stream closed")),
        other => panic!("Expected Protocol error, got {other:?}"),
    }
    conn.host().shutdown().await;
}

#[tokio::test]
async fn both_transports_failing_is_unreachable() {
    let app = Router::new().route("/", get(|| async { "plain text, not MCP" }));
    let url = serve(app).await;

    match connect(&descriptor(&url)).await {
        Err(McpError::Unreachable {
            endpoint,
            primary,
            fallback,
        }) => {
            assert_eq!(endpoint, "echo");
            assert!(primary.contains("405"), "primary: {primary}");
            assert!(fallback.contains("event stream"), "fallback: {fallback}");
        }
        Err(other) => panic!("Expected Unreachable, got {other:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}
