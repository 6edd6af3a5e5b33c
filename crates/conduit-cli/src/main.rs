//! Conduit CLI: chat with a model that can call tools on MCP servers.

mod commands;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{SlashResult, parse_command};
use conduit_api::ApiClient;
use conduit_config::{CliOverrides, ConduitConfig};
use conduit_core::{Conversation, ModelClient, TurnEvent, TurnOutcome};
use conduit_mcp::ServerRegistry;
use conduit_types::preview;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "conduit", version, about = "Chat with a model that can call MCP tools")]
struct Cli {
    /// Path to the endpoint list (JSON array of server descriptors)
    #[arg(long)]
    servers: Option<PathBuf>,

    /// Path of the chat log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides ANTHROPIC_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Maximum tokens in each model reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Show raw tool results instead of asking the model to summarize them
    #[arg(long)]
    no_summarize: bool,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = ConduitConfig::load(CliOverrides {
        api_key: cli.api_key,
        model: cli.model,
        max_tokens: cli.max_tokens,
        servers: cli.servers,
        log_file: cli.log_file,
        no_summarize: cli.no_summarize,
    })
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let provider = ApiClient::new(&config.api_key, &config.api_base_url)
        .context("Failed to create API client")?;
    let model = ModelClient::new(
        Arc::new(provider),
        config.model.clone(),
        config.max_tokens,
        config.model_timeout_ms,
    );

    let registry = connect_endpoints(&config).await;
    let conversation = Conversation::new(registry, model, &config.log_file, config.summarize)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    repl(conversation, &config).await
}

/// Connect every configured endpoint. Failures are reported and skipped.
async fn connect_endpoints(config: &ConduitConfig) -> ServerRegistry {
    eprintln!(
        "Connecting to {} endpoint(s) from {}...",
        config.endpoints.len(),
        config.servers_file.display()
    );
    let (registry, failures) = ServerRegistry::connect_all(&config.endpoints).await;
    tracing::debug!(
        "Connected {} of {} endpoint(s)",
        registry.len(),
        config.endpoints.len()
    );
    for failure in &failures {
        eprintln!("Warning: skipping '{}': {}", failure.endpoint, failure.error);
    }
    if registry.is_empty() {
        eprintln!("Warning: no endpoint is available; the model can only answer directly.");
    }
    registry
}

async fn repl(mut conversation: Conversation, config: &ConduitConfig) -> Result<()> {
    eprintln!(
        "conduit v{} (model: {}, endpoints: {}, session: {})",
        env!("CARGO_PKG_VERSION"),
        config.model,
        conversation.registry().list().join(", "),
        conversation.transcript().short_id()
    );
    eprintln!("Type your message, /help for commands. Press Ctrl+D to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                break;
            }
        };
        let Some(line) = line else {
            eprintln!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(&cancel);

        if let Some(command) = parse_command(input) {
            let result = commands::execute(command, &mut conversation, &cancel).await;
            watcher.abort();
            match result {
                SlashResult::Continue => continue,
                SlashResult::Break => break,
            }
        }

        let outcome = conversation.send(input, &cancel, print_event).await;
        watcher.abort();
        if let TurnOutcome::Dispatched {
            succeeded: 0,
            failed,
            ..
        } = outcome
        {
            eprintln!("No tool call succeeded ({failed} failed).");
        }
        println!();
    }

    conversation.shutdown().await;
    Ok(())
}

/// Cancel `token` on the next Ctrl+C. Abort the handle once the turn ends.
fn cancel_on_ctrl_c(token: &CancellationToken) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

fn print_event(event: TurnEvent) {
    match event {
        TurnEvent::Answer(text) => println!("{text}"),
        TurnEvent::ToolStart {
            endpoint,
            tool,
            arguments,
        } => eprintln!("  [tool: {endpoint}.{tool} {}]", preview(&arguments, 80)),
        TurnEvent::ToolResult { text, .. } => println!("{text}"),
        TurnEvent::Warning(message) => eprintln!("Warning: {message}"),
        TurnEvent::Cancelled => eprintln!("Cancelled."),
    }
}
