//! Async stream that converts SSE events into typed StreamEvents.

use conduit_types::sse::SseParser;
use conduit_types::{ApiError, StreamEvent};
use futures_core::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

pin_project! {
    /// An async stream of typed [`StreamEvent`]s from the Anthropic Messages API.
    pub struct MessageStream {
        #[pin]
        inner: ByteStream,
        parser: SseParser,
        // Bytes of a UTF-8 sequence split across chunks.
        partial: Vec<u8>,
        ready: VecDeque<Result<StreamEvent, ApiError>>,
    }
}

impl MessageStream {
    /// Create a new MessageStream from a reqwest byte stream.
    pub fn new(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            parser: SseParser::new(),
            partial: Vec::new(),
            ready: VecDeque::new(),
        }
    }
}

impl Stream for MessageStream {
    type Item = Result<StreamEvent, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.partial.extend_from_slice(&bytes);
                    let valid = match std::str::from_utf8(&this.partial[..]) {
                        Ok(text) => text.len(),
                        Err(e) => e.valid_up_to(),
                    };
                    let text = String::from_utf8_lossy(&this.partial[..valid]).into_owned();
                    this.partial.drain(..valid);

                    for sse_event in this.parser.feed(&text) {
                        match parse_stream_event(sse_event.event_type.as_deref(), &sse_event.data)
                        {
                            Ok(Some(event)) => this.ready.push_back(Ok(event)),
                            Ok(None) => {}
                            Err(e) => this.ready.push_back(Err(e)),
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ApiError::Network(e.to_string()))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Decode one SSE event. Unnamed events and event types this client does
/// not know yield `Ok(None)`.
fn parse_stream_event(event_type: Option<&str>, data: &str) -> Result<Option<StreamEvent>, ApiError> {
    let Some(event_type) = event_type else {
        return Ok(None);
    };
    match serde_json::from_str(data) {
        Ok(StreamEvent::Unknown) => {
            tracing::debug!("Skipping unknown SSE event type: {event_type}");
            Ok(None)
        }
        Ok(event) => Ok(Some(event)),
        Err(e) => Err(ApiError::StreamParse(format!("{event_type}: {e}"))),
    }
}
