mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{user_turn, FixedModel};
use turnstile::error::TurnstileError;
use turnstile::executor::{ChatExecutor, DirectChatExecutor, StreamingChatExecutor, SyncAsStreaming};
use turnstile::turn::{TurnOrchestrator, TurnRequest, TurnStatus, TurnSubscribers};
use turnstile::types::{ChatMessage, ChatRequest};

fn request(text: &str) -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user(text)], Default::default())
}

#[tokio::test]
async fn direct_executor_returns_the_model_response() {
    let model = FixedModel::new();
    model.queue_text("direct answer");
    let executor = DirectChatExecutor::new(model.clone());

    let response = executor.execute(&request("hi")).await.unwrap();
    assert_eq!(response.text(), "direct answer");
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn direct_executor_resolves_transport_carriers() {
    let model = FixedModel::new();
    model.queue_error(TurnstileError::api(503, "upstream down"));
    let executor = DirectChatExecutor::new(model);

    let err = executor.execute(&request("hi")).await.unwrap_err();
    assert!(matches!(
        err,
        TurnstileError::InternalServer { status: 503, .. }
    ));
}

#[tokio::test]
async fn bridged_sync_model_streams_through_the_executor() {
    // Synchronous transport, exposed as streaming, folded back to a
    // complete response: the round trip must be lossless.
    let model = FixedModel::new();
    model.queue_text("round tripped");
    let executor = StreamingChatExecutor::new(Arc::new(SyncAsStreaming::new(model)));

    let response = executor.execute(&request("hi")).await.unwrap();
    assert_eq!(response.text(), "round tripped");
}

#[tokio::test]
async fn sync_model_drives_a_full_turn_through_the_adapter() {
    let model = FixedModel::new();
    model.queue_text("adapted answer");

    let orchestrator = TurnOrchestrator::new(Arc::new(SyncAsStreaming::new(model)));
    let handle = orchestrator
        .start(
            TurnRequest::new(user_turn("hi")),
            TurnSubscribers::new().ignore_errors(),
        )
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.status, TurnStatus::Completed);
    assert_eq!(result.response.unwrap().text(), "adapted answer");
}
