//! Provider trait for model backends.

use crate::{ApiError, CreateMessageRequest, StreamEvent};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;

/// A boxed async stream of events from a model provider.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ApiError>> + Send>>;

/// A model backend that answers a rendered prompt with a stream of events.
///
/// Dyn-compatible so the conversation can hold an `Arc<dyn Provider>` and
/// tests can swap in a canned provider.
pub trait Provider: Send + Sync {
    /// Send a streaming message request, returning a stream of events.
    fn create_message_stream<'a>(
        &'a self,
        request: &'a CreateMessageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, ApiError>> + Send + 'a>>;

    /// Provider name for logging/display (e.g., "anthropic").
    fn name(&self) -> &str;
}
