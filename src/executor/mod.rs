//! Chat execution over either transport shape.
//!
//! Callers that want one complete response should not care whether the
//! underlying transport streams. [`ChatExecutor`] is that seam: a direct
//! implementation for synchronous transports, a bridging implementation
//! that folds a stream to its terminal response, and an adapter exposing
//! a synchronous transport through the streaming trait.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{map_failure, Result, TurnstileError};
use crate::model::{ChatModel, ChatStream, StreamingChatModel};
use crate::types::{ChatRequest, ChatResponse, ContentPart, StreamEvent};

/// Executes one chat exchange to a complete response.
#[async_trait]
pub trait ChatExecutor: Send + Sync {
    async fn execute(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Executor over a transport that already answers synchronously.
pub struct DirectChatExecutor {
    model: Arc<dyn ChatModel>,
}

impl DirectChatExecutor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ChatExecutor for DirectChatExecutor {
    async fn execute(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.model.chat(request).await.map_err(map_failure)
    }
}

/// Reports stream errors observed by the bridge.
pub type StreamErrorCallback = Arc<dyn Fn(&TurnstileError) + Send + Sync>;

/// Executor that folds a streamed exchange into its terminal response.
///
/// The stream is driven on its own task; the caller awaits a one-shot
/// gate that resolves exactly once. A stream error is handed to the
/// error callback (or logged) and then resolves the gate; a stream that
/// ends without a terminal event resolves it too. In both cases the
/// caller gets [`ChatResponse::empty`] back rather than an error, so
/// this executor never hangs and never hands out a missing response.
///
/// Pairing it with a cancellable stream still needs an external timeout:
/// after a cooperative cancel the transport may simply stop emitting.
pub struct StreamingChatExecutor {
    model: Arc<dyn StreamingChatModel>,
    on_error: Option<StreamErrorCallback>,
}

impl StreamingChatExecutor {
    pub fn new(model: Arc<dyn StreamingChatModel>) -> Self {
        Self {
            model,
            on_error: None,
        }
    }

    /// Observe stream errors instead of having them logged and swallowed.
    pub fn with_error_callback(mut self, callback: StreamErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }
}

#[async_trait]
impl ChatExecutor for StreamingChatExecutor {
    async fn execute(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let stream = self.model.stream_chat(request).await.map_err(map_failure)?;

        let (gate_tx, gate_rx) = oneshot::channel();
        tokio::spawn(drive(stream, gate_tx, self.on_error.clone()));

        match gate_rx.await {
            Ok(Some(response)) => Ok(response),
            // No terminal response arrived, or the driver panicked.
            // Defensive default, never a missing response.
            Ok(None) | Err(_) => Ok(ChatResponse::empty()),
        }
    }
}

/// Consume the stream and resolve the gate exactly once.
async fn drive(
    mut stream: ChatStream,
    gate: oneshot::Sender<Option<ChatResponse>>,
    on_error: Option<StreamErrorCallback>,
) {
    let mut text = String::new();
    let mut calls = Vec::new();
    let mut response: Option<ChatResponse> = None;

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::PartialText { text: chunk }) => text.push_str(&chunk),
            Ok(StreamEvent::PartialThinking { .. }) => {}
            Ok(StreamEvent::PartialToolCall(_)) => {
                // Fragment reassembly belongs to the turn loop; a bridged
                // caller only needs the completed calls.
            }
            Ok(StreamEvent::CompleteToolCall(call)) => calls.push(call),
            Ok(StreamEvent::Complete(complete)) => {
                response = Some(assemble(complete, text, calls));
                break;
            }
            Err(err) => {
                let err = map_failure(err);
                match &on_error {
                    Some(callback) => {
                        // A panicking error callback must not keep the
                        // gate from resolving.
                        if catch_unwind(AssertUnwindSafe(|| callback(&err))).is_err() {
                            warn!("stream error callback panicked");
                        }
                    }
                    None => warn!(error = %err, "stream error swallowed by the bridge"),
                }
                break;
            }
        }
    }

    if gate.send(response).is_err() {
        debug!("bridged caller went away before the stream finished");
    }

    // Drain whatever the transport still emits so it can shut down
    // cleanly; late events after the terminal one carry no information.
    while let Some(event) = stream.next().await {
        if let Err(err) = event {
            warn!(error = %err, "stream error after terminal event");
        }
    }
}

/// Fill in content the terminal response omitted but the stream carried.
fn assemble(
    mut response: ChatResponse,
    text: String,
    calls: Vec<crate::types::ToolExecutionRequest>,
) -> ChatResponse {
    if response.text().is_empty() && !text.is_empty() {
        response = response.with_text(text);
    }
    if response.tool_calls().is_empty() && !calls.is_empty() {
        response
            .message
            .content
            .extend(calls.into_iter().map(ContentPart::ToolCall));
    }
    response
}

/// Expose a synchronous transport through the streaming trait.
///
/// The complete response is replayed as a short event sequence: one text
/// chunk, one event per requested tool call, then the terminal response.
pub struct SyncAsStreaming {
    model: Arc<dyn ChatModel>,
}

impl SyncAsStreaming {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl StreamingChatModel for SyncAsStreaming {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream> {
        let response = self.model.chat(request).await?;
        let stream = async_stream::stream! {
            let text = response.text();
            if !text.is_empty() {
                yield Ok(StreamEvent::PartialText { text });
            }
            let calls: Vec<_> = response.tool_calls().into_iter().cloned().collect();
            for call in calls {
                yield Ok(StreamEvent::CompleteToolCall(call));
            }
            yield Ok(StreamEvent::Complete(response));
        };
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, ResponseMetadata, Role};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Scripted {
        events: Mutex<Option<Vec<Result<StreamEvent>>>>,
    }

    impl Scripted {
        fn new(events: Vec<Result<StreamEvent>>) -> Self {
            Self {
                events: Mutex::new(Some(events)),
            }
        }
    }

    #[async_trait]
    impl StreamingChatModel for Scripted {
        async fn stream_chat(&self, _request: &ChatRequest) -> Result<ChatStream> {
            let events = self
                .events
                .lock()
                .unwrap()
                .take()
                .expect("scripted stream consumed twice");
            Ok(futures::stream::iter(events).boxed())
        }
    }

    fn complete(text: &str) -> ChatResponse {
        ChatResponse::new(ChatMessage::assistant(text), ResponseMetadata::default())
    }

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hi")], Default::default())
    }

    #[tokio::test]
    async fn bridge_returns_the_terminal_response() {
        let model = Arc::new(Scripted::new(vec![
            Ok(StreamEvent::PartialText {
                text: "hel".to_string(),
            }),
            Ok(StreamEvent::PartialText {
                text: "lo".to_string(),
            }),
            Ok(StreamEvent::Complete(complete("hello"))),
        ]));
        let executor = StreamingChatExecutor::new(model);

        let response = executor.execute(&request()).await.unwrap();
        assert_eq!(response.text(), "hello");
    }

    #[tokio::test]
    async fn bridge_fills_text_from_chunks_when_terminal_is_empty() {
        let model = Arc::new(Scripted::new(vec![
            Ok(StreamEvent::PartialText {
                text: "built from chunks".to_string(),
            }),
            Ok(StreamEvent::Complete(ChatResponse::empty())),
        ]));
        let executor = StreamingChatExecutor::new(model);

        let response = executor.execute(&request()).await.unwrap();
        assert_eq!(response.text(), "built from chunks");
    }

    #[tokio::test]
    async fn error_only_stream_returns_empty_after_the_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let model = Arc::new(Scripted::new(vec![Err(TurnstileError::api(
            429, "slow down",
        ))]));
        let executor = StreamingChatExecutor::new(model)
            .with_error_callback(Arc::new(move |err| {
                sink.lock().unwrap().push(err.to_string());
            }));

        let response = executor.execute(&request()).await.unwrap();
        assert_eq!(response.text(), "");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        // Carrier resolved before delivery.
        assert!(seen[0].contains("Rate limited"));
    }

    #[tokio::test]
    async fn panicking_error_callback_still_resolves_the_gate() {
        let model = Arc::new(Scripted::new(vec![Err(TurnstileError::Stream(
            "boom".to_string(),
        ))]));
        let executor = StreamingChatExecutor::new(model)
            .with_error_callback(Arc::new(|_| panic!("consumer bug")));

        let response = executor.execute(&request()).await.unwrap();
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    async fn stream_without_terminal_event_returns_empty() {
        let model = Arc::new(Scripted::new(vec![Ok(StreamEvent::PartialText {
            text: "never finished".to_string(),
        })]));
        let executor = StreamingChatExecutor::new(model);

        let response = executor.execute(&request()).await.unwrap();
        assert_eq!(response.text(), "");
    }

    struct Fixed(ChatResponse);

    #[async_trait]
    impl ChatModel for Fixed {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn sync_adapter_replays_text_then_terminal() {
        let adapter = SyncAsStreaming::new(Arc::new(Fixed(complete("answer"))));
        let mut stream = adapter.stream_chat(&request()).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, StreamEvent::PartialText { ref text } if text == "answer"));
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, StreamEvent::Complete(_)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn sync_adapter_replays_tool_calls() {
        let mut response = complete("");
        response.message = ChatMessage {
            role: Role::Assistant,
            content: vec![ContentPart::ToolCall(
                crate::types::ToolExecutionRequest::new(
                    Some("call-1".to_string()),
                    "lookup",
                    r#"{"q":"x"}"#,
                ),
            )],
            name: None,
            timestamp: None,
        };
        let adapter = SyncAsStreaming::new(Arc::new(Fixed(response)));
        let mut stream = adapter.stream_chat(&request()).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, StreamEvent::CompleteToolCall(ref c) if c.name == "lookup"));
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::Complete(_)
        ));
    }
}
