//! Built-in commands, recognized before any input reaches the model.

use std::fmt::Write;

use conduit_core::Conversation;
use conduit_mcp::{ServerRegistry, ToolInfo};
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    Servers,
    Tools(&'a str),
    Call {
        endpoint: &'a str,
        tool: &'a str,
        arguments: Option<&'a str>,
    },
    History,
    Refresh(&'a str),
    Help,
    Quit,
    /// A known command with missing arguments.
    Usage(&'static str),
    Unknown(&'a str),
}

pub enum SlashResult {
    Continue,
    Break,
}

/// Parse `input` as a built-in command. `None` means it is a chat message.
pub fn parse_command(input: &str) -> Option<Command<'_>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("salir") {
        return Some(Command::Quit);
    }
    if !input.starts_with('/') {
        return None;
    }

    let (cmd, rest) = split_word(input);
    let command = match cmd.to_ascii_lowercase().as_str() {
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        "/servers" => Command::Servers,
        "/history" => Command::History,
        "/tools" => match split_word(rest).0 {
            "" => Command::Usage("/tools <endpoint>"),
            endpoint => Command::Tools(endpoint),
        },
        "/refresh" => match split_word(rest).0 {
            "" => Command::Usage("/refresh <endpoint>"),
            endpoint => Command::Refresh(endpoint),
        },
        "/call" => {
            let (endpoint, rest) = split_word(rest);
            let (tool, arguments) = split_word(rest);
            if endpoint.is_empty() || tool.is_empty() {
                Command::Usage("/call <endpoint> <tool> [json]")
            } else {
                Command::Call {
                    endpoint,
                    tool,
                    arguments: Some(arguments).filter(|a| !a.is_empty()),
                }
            }
        }
        _ => Command::Unknown(cmd),
    };
    Some(command)
}

/// First whitespace-delimited word, and the trimmed remainder.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

/// What a command has to say, and where it goes. Results and listings go
/// to stdout; usage hints and failures go to stderr.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Out(String),
    Err(String),
}

/// Run a parsed command against the conversation and print its reply.
pub async fn execute(
    command: Command<'_>,
    conversation: &mut Conversation,
    cancel: &CancellationToken,
) -> SlashResult {
    match respond(command, conversation, cancel).await {
        None => SlashResult::Break,
        Some(Reply::Out(text)) => {
            print!("{text}");
            SlashResult::Continue
        }
        Some(Reply::Err(text)) => {
            eprint!("{text}");
            SlashResult::Continue
        }
    }
}

/// The reply to a command, `None` when it closes the loop.
pub async fn respond(
    command: Command<'_>,
    conversation: &mut Conversation,
    cancel: &CancellationToken,
) -> Option<Reply> {
    let reply = match command {
        Command::Quit => return None,
        Command::Help => Reply::Out(help_text().to_string()),
        Command::Servers => Reply::Out(render_servers(conversation.registry())),
        Command::Tools(endpoint) => match conversation.registry().tools_of(endpoint) {
            Some(tools) => Reply::Out(render_tools(endpoint, tools)),
            None => Reply::Err(format!("Unknown endpoint '{endpoint}'. Try /servers.\n")),
        },
        Command::Call {
            endpoint,
            tool,
            arguments,
        } => match conversation
            .call_direct(endpoint, tool, arguments, cancel)
            .await
        {
            Ok(text) => Reply::Out(format!("{text}\n")),
            Err(e) => Reply::Err(format!("Error: {e}\n")),
        },
        Command::History => Reply::Out(format!("{}\n", conversation.transcript().render())),
        Command::Refresh(endpoint) => match conversation.refresh(endpoint).await {
            Ok(count) => Reply::Out(format!("Refreshed {endpoint}: {count} tool(s).\n")),
            Err(e) => Reply::Err(format!("Failed to refresh {endpoint}: {e}\n")),
        },
        Command::Usage(usage) => Reply::Err(format!("Usage: {usage}\n")),
        Command::Unknown(cmd) => Reply::Err(format!(
            "Unknown command: {cmd}. Type /help for available commands.\n"
        )),
    };
    Some(reply)
}

pub fn render_servers(registry: &ServerRegistry) -> String {
    if registry.is_empty() {
        return "No endpoints connected.\n".to_string();
    }
    let width = registry.list().iter().map(|n| n.len()).max().unwrap_or(0);
    let mut out = String::from("Connected endpoints:\n");
    for connection in registry.connections() {
        let _ = writeln!(
            out,
            "  {:<width$}  {:<5}  {} tool(s)",
            connection.name(),
            connection.descriptor().kind.label(),
            connection.tools().len()
        );
    }
    out
}

/// List a catalog, sorted by tool name so repeated calls print the same text.
pub fn render_tools(endpoint: &str, tools: &[ToolInfo]) -> String {
    if tools.is_empty() {
        return format!("{endpoint} has no tools.\n");
    }
    let mut sorted: Vec<&ToolInfo> = tools.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = format!("Tools on {endpoint}:\n");
    for tool in sorted {
        match tool.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => {
                let _ = writeln!(out, "  {} — {description}", tool.name);
            }
            _ => {
                let _ = writeln!(out, "  {}", tool.name);
            }
        }
    }
    out
}

pub fn help_text() -> &'static str {
    "Available commands:
  /servers                        — List connected endpoints
  /tools <endpoint>               — List an endpoint's tools
  /call <endpoint> <tool> [json]  — Call a tool directly (no summary)
  /history                        — Show the transcript
  /refresh <endpoint>             — Re-read an endpoint's tool list
  /help                           — Show this help
  /quit, /exit, salir             — Exit

Anything else is sent to the model. Ctrl+C cancels a running turn.
"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    use conduit_core::ModelClient;
    use conduit_types::{
        ApiError, CreateMessageRequest,
        provider::{EventStream, Provider},
    };

    /// Built-in commands never reach the model.
    struct Offline;

    impl Provider for Offline {
        fn create_message_stream<'a>(
            &'a self,
            _request: &'a CreateMessageRequest,
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, ApiError>> + Send + 'a>> {
            Box::pin(async { Err(ApiError::BadRequest { message: "offline".into() }) })
        }

        fn name(&self) -> &str {
            "offline"
        }
    }

    fn offline_conversation() -> Conversation {
        let model = ModelClient::new(Arc::new(Offline), "none", 100, 1_000);
        let log_path = std::env::temp_dir().join("conduit-commands-unwritten.json");
        Conversation::new(ServerRegistry::new(), model, log_path, false).unwrap()
    }

    fn tool(name: &str, description: Option<&str>) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            description: description.map(str::to_string),
            input_schema: None,
        }
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("what is 2 + 2?"), None);
        assert_eq!(parse_command("salir del bucle"), None);
    }

    #[test]
    fn quit_aliases() {
        for input in ["/quit", "/exit", "salir", "SALIR", "  Salir  ", "/QUIT"] {
            assert_eq!(parse_command(input), Some(Command::Quit), "{input}");
        }
    }

    #[test]
    fn call_with_and_without_arguments() {
        assert_eq!(
            parse_command("/call mathy get-random"),
            Some(Command::Call {
                endpoint: "mathy",
                tool: "get-random",
                arguments: None,
            })
        );
        assert_eq!(
            parse_command(r#"/call mathy add {"a": 1, "b": 2}"#),
            Some(Command::Call {
                endpoint: "mathy",
                tool: "add",
                arguments: Some(r#"{"a": 1, "b": 2}"#),
            })
        );
    }

    #[test]
    fn missing_arguments_show_usage() {
        assert!(matches!(parse_command("/call mathy"), Some(Command::Usage(_))));
        assert!(matches!(parse_command("/tools"), Some(Command::Usage(_))));
        assert!(matches!(parse_command("/refresh "), Some(Command::Usage(_))));
    }

    #[test]
    fn endpoint_arguments() {
        assert_eq!(parse_command("/tools mathy"), Some(Command::Tools("mathy")));
        assert_eq!(
            parse_command("/refresh  remote"),
            Some(Command::Refresh("remote"))
        );
    }

    #[test]
    fn unknown_slash_word() {
        assert_eq!(parse_command("/frobnicate now"), Some(Command::Unknown("/frobnicate")));
    }

    #[test]
    fn tools_listing_is_sorted_and_stable() {
        let tools = vec![
            tool("get-random", Some("A random number from 1 to 9")),
            tool("add", Some("Add two numbers")),
            tool("noop", None),
        ];
        let first = render_tools("mathy", &tools);
        assert_eq!(
            first,
            "Tools on mathy:\n  add — Add two numbers\n  get-random — A random number from 1 to 9\n  noop\n"
        );
        assert_eq!(render_tools("mathy", &tools), first);
    }

    #[test]
    fn empty_listings() {
        assert_eq!(render_tools("mathy", &[]), "mathy has no tools.\n");
        assert_eq!(render_servers(&ServerRegistry::new()), "No endpoints connected.\n");
    }

    #[tokio::test]
    async fn listings_go_to_stdout() {
        let mut conversation = offline_conversation();
        let cancel = CancellationToken::new();

        assert_eq!(
            respond(Command::Servers, &mut conversation, &cancel).await,
            Some(Reply::Out("No endpoints connected.\n".to_string()))
        );
        assert_eq!(
            respond(Command::Help, &mut conversation, &cancel).await,
            Some(Reply::Out(help_text().to_string()))
        );
        assert!(matches!(
            respond(Command::History, &mut conversation, &cancel).await,
            Some(Reply::Out(_))
        ));
    }

    #[tokio::test]
    async fn failures_go_to_stderr() {
        let mut conversation = offline_conversation();
        let cancel = CancellationToken::new();

        match respond(Command::Tools("nowhere"), &mut conversation, &cancel).await {
            Some(Reply::Err(text)) => assert!(text.contains("Unknown endpoint 'nowhere'")),
            other => panic!("Expected stderr reply, got {other:?}"),
        }
        let call = Command::Call {
            endpoint: "nowhere",
            tool: "get-random",
            arguments: None,
        };
        assert!(matches!(
            respond(call, &mut conversation, &cancel).await,
            Some(Reply::Err(_))
        ));
        assert!(matches!(
            respond(Command::Unknown("/frob"), &mut conversation, &cancel).await,
            Some(Reply::Err(_))
        ));
        assert_eq!(respond(Command::Quit, &mut conversation, &cancel).await, None);
    }
}
