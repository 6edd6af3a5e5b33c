//! `remote-random`: an HTTP MCP server with `get-random`, on `$PORT`
//! (default 8080).

use std::net::SocketAddr;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let port = match std::env::var("PORT") {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid PORT '{value}', using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("remote-random MCP server listening on {addr}");
    axum::serve(listener, conduit_demo::router(conduit_demo::remote_random())).await
}
