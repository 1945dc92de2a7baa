//! Shared test helpers: scripted model transports and counting guardrails.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use turnstile::error::{Result, TurnstileError};
use turnstile::guardrail::{Guardrail, GuardrailRequest, GuardrailResult};
use turnstile::model::{ChatModel, ChatStream, StreamingChatModel};
use turnstile::types::{
    ChatMessage, ChatRequest, ChatResponse, ResponseMetadata, StreamEvent, ToolExecutionRequest,
};

/// A streaming transport that replays queued event scripts, one script per
/// `stream_chat` call.
pub struct ScriptedModel {
    scripts: Mutex<VecDeque<Vec<Result<StreamEvent>>>>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    /// Queue a raw event script for the next call.
    pub fn queue(&self, events: Vec<Result<StreamEvent>>) {
        self.scripts.lock().unwrap().push_back(events);
    }

    /// Queue a round that streams `text` in two chunks and completes.
    pub fn queue_text(&self, text: &str) {
        let (head, tail) = text.split_at(text.len() / 2);
        self.queue(vec![
            Ok(StreamEvent::PartialText {
                text: head.to_string(),
            }),
            Ok(StreamEvent::PartialText {
                text: tail.to_string(),
            }),
            Ok(StreamEvent::Complete(response(text))),
        ]);
    }

    /// Queue a round that requests one tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, arguments: &str) {
        self.queue(vec![
            Ok(StreamEvent::CompleteToolCall(ToolExecutionRequest::new(
                Some(id.to_string()),
                name,
                arguments,
            ))),
            Ok(StreamEvent::Complete(ChatResponse::empty())),
        ]);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamingChatModel for ScriptedModel {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let events = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Ok(StreamEvent::Complete(response("out of script")))]);
        Ok(futures::stream::iter(events).boxed())
    }
}

/// A synchronous transport that replays queued complete responses.
pub struct FixedModel {
    responses: Mutex<VecDeque<Result<ChatResponse>>>,
    pub calls: AtomicUsize,
}

impl FixedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(response(text)));
    }

    pub fn queue_error(&self, err: TurnstileError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }
}

#[async_trait]
impl ChatModel for FixedModel {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(response("out of script")))
    }
}

pub fn response(text: &str) -> ChatResponse {
    ChatResponse::new(ChatMessage::assistant(text), ResponseMetadata::default())
}

pub fn user_turn(text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(text)]
}

/// A guardrail that counts invocations and returns a fixed result.
pub struct CountingGuardrail {
    name: String,
    pub runs: Arc<AtomicUsize>,
    result: Box<dyn Fn(&GuardrailRequest) -> Result<GuardrailResult> + Send + Sync>,
}

impl CountingGuardrail {
    pub fn passing(name: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        Self::with(name, |_| Ok(GuardrailResult::success()))
    }

    pub fn fatal(name: &str, message: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let message = message.to_string();
        Self::with(name, move |_| Ok(GuardrailResult::fatal(message.clone())))
    }

    pub fn failing(name: &str, message: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let message = message.to_string();
        Self::with(name, move |_| {
            Ok(GuardrailResult::failure(message.clone()))
        })
    }

    pub fn rewriting(name: &str, replacement: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let replacement = replacement.to_string();
        Self::with(name, move |_| {
            Ok(GuardrailResult::rewrite(replacement.clone()))
        })
    }

    pub fn with<F>(name: &str, result: F) -> (Arc<Self>, Arc<AtomicUsize>)
    where
        F: Fn(&GuardrailRequest) -> Result<GuardrailResult> + Send + Sync + 'static,
    {
        let runs = Arc::new(AtomicUsize::new(0));
        let guardrail = Arc::new(Self {
            name: name.to_string(),
            runs: runs.clone(),
            result: Box::new(result),
        });
        (guardrail, runs)
    }
}

impl Guardrail for CountingGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, request: &GuardrailRequest) -> Result<GuardrailResult> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        (self.result)(request)
    }
}

/// A tool that echoes its arguments back, counting calls.
pub fn echo_tool(name: &str) -> (Arc<dyn turnstile::tools::Tool>, Arc<AtomicUsize>) {
    use turnstile::tools::{FnTool, ToolSpecification};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let tool = FnTool::new(
        ToolSpecification::object(name, "echoes its arguments")
            .string("value", "value to echo", true)
            .build(),
        move |args, _ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "echoed": args.value().clone() }))
            }
        },
    );
    (Arc::new(tool), calls)
}
