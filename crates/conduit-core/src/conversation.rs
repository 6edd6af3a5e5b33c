//! The conversation context: registry, transcript, chat log and model, and
//! the turn loop that ties them together.

use std::path::PathBuf;

use conduit_mcp::{McpError, ServerRegistry};
use conduit_session::{ChatLog, LogKind, Role, SessionError, Transcript};
use tokio_util::sync::CancellationToken;

use crate::dispatch::dispatch;
use crate::error::{DispatchError, ModelError};
use crate::intent::{Intent, parse_arguments, parse_intents};
use crate::model::ModelClient;
use crate::preamble::build_preamble;

/// Progress reported while a turn runs, in the order it happens.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// The model answered without requesting any tool.
    Answer(String),
    /// A validated intent is about to be invoked.
    ToolStart {
        endpoint: String,
        tool: String,
        arguments: String,
    },
    /// A tool call finished; `text` is the summary, or the raw result.
    ToolResult {
        endpoint: String,
        tool: String,
        text: String,
    },
    /// Something went wrong but the turn goes on (or ends without an answer).
    Warning(String),
    /// The turn was cancelled.
    Cancelled,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Direct answer, recorded as an assistant entry.
    Answered(String),
    /// At least one intent was found. `reply` holds the joined tool replies
    /// and is empty when every intent failed.
    Dispatched {
        reply: String,
        succeeded: usize,
        failed: usize,
    },
    /// The model call failed; the message was shown but not recorded.
    ModelFailed(String),
    Cancelled,
}

pub struct Conversation {
    registry: ServerRegistry,
    transcript: Transcript,
    log: ChatLog,
    model: ModelClient,
    summarize: bool,
}

impl Conversation {
    /// Start a session: the preamble is built from the registry as it is
    /// now and primed into a fresh transcript.
    pub fn new(
        registry: ServerRegistry,
        model: ModelClient,
        log_path: impl Into<PathBuf>,
        summarize: bool,
    ) -> Result<Self, SessionError> {
        let mut transcript = Transcript::new();
        transcript.prime(build_preamble(&registry))?;
        let log = ChatLog::new(log_path, transcript.id);
        tracing::debug!(
            "Session {} started with {} endpoint(s)",
            transcript.short_id(),
            registry.len()
        );
        Ok(Self {
            registry,
            transcript,
            log,
            model,
            summarize,
        })
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    /// Re-query one endpoint's catalog. The preamble is left as primed.
    pub async fn refresh(&mut self, endpoint: &str) -> Result<usize, McpError> {
        self.registry.refresh(endpoint).await
    }

    /// Run one user turn: record and log the input, ask the model, then
    /// either show its answer or dispatch every intent it emitted.
    pub async fn send<F>(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> TurnOutcome
    where
        F: FnMut(TurnEvent),
    {
        self.record(Role::User, input);
        self.append_log(LogKind::UserMessage {
            content: input.to_string(),
        })
        .await;

        let prompt = self.transcript.render_dialogue();
        let output = match self
            .model
            .complete(self.transcript.system(), &prompt, cancel)
            .await
        {
            Ok(output) => output,
            Err(ModelError::Cancelled) => {
                on_event(TurnEvent::Cancelled);
                return TurnOutcome::Cancelled;
            }
            Err(e) => {
                let message = format!("Model error: {e}");
                tracing::warn!("{message}");
                self.append_log(LogKind::AssistantMessage {
                    content: message.clone(),
                })
                .await;
                on_event(TurnEvent::Warning(message.clone()));
                return TurnOutcome::ModelFailed(message);
            }
        };

        let intents = parse_intents(&output);
        if intents.is_empty() {
            self.commit_reply(&output).await;
            on_event(TurnEvent::Answer(output.clone()));
            return TurnOutcome::Answered(output);
        }

        tracing::debug!("Model emitted {} action(s)", intents.len());
        let mut replies = Vec::new();
        let mut failed = 0;

        for parsed in intents {
            if cancel.is_cancelled() {
                return self.cancelled(&replies, &mut on_event).await;
            }
            let intent = match parsed {
                Ok(intent) => intent,
                Err(e) => {
                    failed += 1;
                    on_event(TurnEvent::Warning(e.to_string()));
                    continue;
                }
            };

            on_event(TurnEvent::ToolStart {
                endpoint: intent.endpoint.clone(),
                tool: intent.tool.clone(),
                arguments: serde_json::Value::Object(intent.arguments.clone()).to_string(),
            });
            let raw = match dispatch(&self.registry, &self.log, &intent, cancel).await {
                Ok(raw) => raw,
                Err(DispatchError::Cancelled { .. }) => {
                    return self.cancelled(&replies, &mut on_event).await;
                }
                Err(e) => {
                    failed += 1;
                    on_event(TurnEvent::Warning(e.to_string()));
                    continue;
                }
            };

            let text = match self.summarize_result(input, &intent, raw, cancel).await {
                Ok(text) => text,
                Err(SummaryFallback::Cancelled) => {
                    return self.cancelled(&replies, &mut on_event).await;
                }
                Err(SummaryFallback::Raw { raw, message }) => {
                    on_event(TurnEvent::Warning(message));
                    raw
                }
            };
            on_event(TurnEvent::ToolResult {
                endpoint: intent.endpoint.clone(),
                tool: intent.tool.clone(),
                text: text.clone(),
            });
            replies.push(text);
        }

        let succeeded = replies.len();
        let reply = replies.join("\n\n");
        if !reply.is_empty() {
            self.commit_reply(&reply).await;
        }
        TurnOutcome::Dispatched {
            reply,
            succeeded,
            failed,
        }
    }

    /// Invoke a tool directly. Same validation as a model intent, logged the
    /// same way, but neither summarized nor recorded in the transcript.
    pub async fn call_direct(
        &self,
        endpoint: &str,
        tool: &str,
        raw_arguments: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        let mut intent = Intent::new(endpoint, tool);
        intent.arguments = parse_arguments(&intent.target(), raw_arguments)?;
        dispatch(&self.registry, &self.log, &intent, cancel).await
    }

    /// Tear down every endpoint connection.
    pub async fn shutdown(self) {
        self.registry.shutdown().await;
    }

    async fn summarize_result(
        &self,
        question: &str,
        intent: &Intent,
        raw: String,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryFallback> {
        if !self.summarize {
            return Ok(raw);
        }
        match self
            .model
            .summarize(question, &intent.target(), &raw, cancel)
            .await
        {
            Ok(summary) => Ok(summary),
            Err(ModelError::Cancelled) => Err(SummaryFallback::Cancelled),
            Err(e) => Err(SummaryFallback::Raw {
                message: format!("Could not summarize {}: {e}", intent.target()),
                raw,
            }),
        }
    }

    async fn cancelled<F>(&mut self, replies: &[String], on_event: &mut F) -> TurnOutcome
    where
        F: FnMut(TurnEvent),
    {
        if !replies.is_empty() {
            self.commit_reply(&replies.join("\n\n")).await;
        }
        on_event(TurnEvent::Cancelled);
        TurnOutcome::Cancelled
    }

    async fn commit_reply(&mut self, reply: &str) {
        self.record(Role::Assistant, reply);
        self.append_log(LogKind::AssistantMessage {
            content: reply.to_string(),
        })
        .await;
    }

    fn record(&mut self, role: Role, content: &str) {
        if let Err(e) = self.transcript.record(role, content) {
            tracing::warn!("Failed to record {role:?} entry: {e}");
        }
    }

    async fn append_log(&self, kind: LogKind) {
        if let Err(e) = self.log.append(kind).await {
            tracing::warn!("Failed to write chat log: {e}");
        }
    }
}

enum SummaryFallback {
    Cancelled,
    Raw { raw: String, message: String },
}
