//! HTTP front for a [`DemoServer`]: every JSON-RPC message is a POST to `/`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;

use crate::server::DemoServer;

/// Build the router for `server`. Responses are plain JSON; notifications
/// get `202 Accepted` with no body.
pub fn router(server: DemoServer) -> Router {
    Router::new()
        .route("/", post(rpc_handler))
        .with_state(Arc::new(server))
}

async fn rpc_handler(State(server): State<Arc<DemoServer>>, Json(message): Json<Value>) -> Response {
    match server.handle(message) {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
