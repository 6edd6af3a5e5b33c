//! Thin wrapper over a [`Provider`]: one prompt in, the text reply out.

use std::sync::Arc;
use std::time::Duration;

use conduit_types::provider::Provider;
use conduit_types::{
    ApiError, ContentDelta, CreateMessageRequest, Message, StopReason, StreamEvent, Usage, preview,
};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::ModelError;

/// Output budget for a result summary; summaries are one or two sentences.
const SUMMARY_MAX_TOKENS: u32 = 300;

pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    timeout_ms: u64,
}

impl ModelClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout_ms: u64,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            timeout_ms,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and collect the text reply.
    pub async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        self.complete_with(system, prompt, self.max_tokens, cancel)
            .await
    }

    /// Ask the model to explain a tool result to the user.
    pub async fn summarize(
        &self,
        question: &str,
        target: &str,
        raw_result: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        let prompt = format!(
            "The user asked: {question}\n\n\
             The tool {target} returned:\n{raw_result}\n\n\
             Explain this result to the user in one or two short sentences, \
             in the language the user wrote in. Do not output JSON."
        );
        self.complete_with(None, &prompt, SUMMARY_MAX_TOKENS.min(self.max_tokens), cancel)
            .await
    }

    async fn complete_with(
        &self,
        system: Option<&str>,
        prompt: &str,
        max_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        let request = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![Message::user_text(prompt)],
            system: system.map(str::to_string),
            temperature: None,
            stream: true,
        };

        let call = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.collect_text(&request),
        );
        tokio::select! {
            _ = cancel.cancelled() => Err(ModelError::Cancelled),
            result = call => match result {
                Ok(inner) => inner,
                Err(_) => Err(ModelError::Timeout { timeout_ms: self.timeout_ms }),
            },
        }
    }

    async fn collect_text(&self, request: &CreateMessageRequest) -> Result<String, ModelError> {
        let mut stream = self.provider.create_message_stream(request).await?;
        let mut text = String::new();
        let mut usage = Usage::default();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::MessageStart { message } => usage.add(&message.usage),
                StreamEvent::ContentBlockDelta {
                    delta: ContentDelta::TextDelta { text: chunk },
                    ..
                } => text.push_str(&chunk),
                StreamEvent::MessageDelta { delta, usage: reported } => {
                    if let Some(reported) = reported {
                        usage.add(&reported);
                    }
                    if delta.stop_reason == Some(StopReason::MaxTokens) {
                        tracing::warn!(
                            "Model reply cut off at max_tokens ({})",
                            request.max_tokens
                        );
                    }
                }
                StreamEvent::Error { error } if error.error_type == "overloaded_error" => {
                    return Err(ApiError::Overloaded.into());
                }
                StreamEvent::Error { error } => {
                    return Err(ApiError::Stream {
                        error_type: error.error_type,
                        message: error.message,
                    }
                    .into());
                }
                StreamEvent::MessageStop => break,
                _ => {}
            }
        }

        tracing::debug!(
            "{} reply ({} in / {} out tokens): {}",
            self.provider.name(),
            usage.input_tokens,
            usage.output_tokens,
            preview(&text, 120)
        );

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ApiError::EmptyResponse.into());
        }
        Ok(text)
    }
}
