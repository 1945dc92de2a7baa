//! Model transport contracts.
//!
//! The wire-level provider clients live outside this crate; they are
//! consumed through these two minimal traits. A streaming transport
//! yields [`StreamEvent`]s in arrival order, with `Complete` or an error
//! item as the last event of the stream.

pub mod handle;

pub use handle::{CancellationHandle, StreamingHandle, UnsupportedStreamingHandle};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse, StreamEvent};

/// Event stream produced by a streaming transport.
pub type ChatStream = BoxStream<'static, Result<StreamEvent>>;

/// A synchronous model transport: one request, one complete response.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// A streaming model transport.
#[async_trait]
pub trait StreamingChatModel: Send + Sync {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream>;
}
