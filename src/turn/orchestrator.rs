//! The turn orchestrator: one logical exchange from outgoing request to
//! terminal outcome.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::accumulator::ToolCallAccumulator;
use super::events::{ListenerRegistry, TurnEvent};
use super::subscribers::{TurnContext, TurnSubscribers};
use super::types::TurnResult;
use crate::context::{InvocationContext, MemorySlot};
use crate::error::{map_failure, Result, TurnstileError};
use crate::guardrail::{GuardrailRequest, InputGuardrailChain, OutputGuardrailChain};
use crate::memory::{ChatMemory, Conversation};
use crate::model::{CancellationHandle, StreamingChatModel, StreamingHandle};
use crate::tools::ToolExecutor;
use crate::types::{
    ChatMessage, ChatRequest, ChatRequestParameters, ChatResponse, ContentPart, RetrievalResult,
    Role, StreamEvent, ToolExecutionRequest,
};

/// Hook mapping the outgoing request per memory slot before dispatch.
pub type RequestTransform = Arc<dyn Fn(&MemorySlot, ChatRequest) -> ChatRequest + Send + Sync>;

/// One request to run a turn.
#[derive(Clone)]
pub struct TurnRequest {
    pub invocation: InvocationContext,
    pub messages: Vec<ChatMessage>,
    pub retrieval: Option<RetrievalResult>,
}

impl TurnRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            invocation: InvocationContext::default(),
            messages,
            retrieval: None,
        }
    }

    pub fn with_invocation(mut self, invocation: InvocationContext) -> Self {
        self.invocation = invocation;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalResult) -> Self {
        self.retrieval = Some(retrieval);
        self
    }
}

/// Handle for an in-flight turn.
#[derive(Debug)]
pub struct TurnHandle {
    invocation: InvocationContext,
    handle: Arc<CancellationHandle>,
    result_rx: oneshot::Receiver<TurnResult>,
}

impl TurnHandle {
    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    /// The streaming handle for this turn.
    pub fn streaming_handle(&self) -> Arc<dyn StreamingHandle> {
        self.handle.clone()
    }

    /// Request cancellation of the in-flight stream. Idempotent.
    pub fn cancel(&self) -> Result<()> {
        self.handle.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Await the turn's terminal outcome.
    pub async fn wait(self) -> TurnResult {
        self.result_rx
            .await
            .unwrap_or_else(|_| TurnResult::cancelled())
    }
}

/// Drives one conversational turn: request building, input guardrails,
/// streamed dispatch, event forwarding, the bounded tool loop, output
/// guardrails, and exactly one terminal outcome.
#[derive(Clone)]
pub struct TurnOrchestrator {
    model: Arc<dyn StreamingChatModel>,
    tools: ToolExecutor,
    memory: Option<Arc<dyn ChatMemory>>,
    input_guardrails: InputGuardrailChain,
    output_guardrails: OutputGuardrailChain,
    listeners: Arc<ListenerRegistry>,
    request_transform: Option<RequestTransform>,
    parameters: ChatRequestParameters,
}

impl TurnOrchestrator {
    pub fn new(model: Arc<dyn StreamingChatModel>) -> Self {
        Self {
            model,
            tools: ToolExecutor::default(),
            memory: None,
            input_guardrails: InputGuardrailChain::default(),
            output_guardrails: OutputGuardrailChain::default(),
            listeners: Arc::new(ListenerRegistry::empty()),
            request_transform: None,
            parameters: ChatRequestParameters::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolExecutor) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn ChatMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_input_guardrails(mut self, chain: InputGuardrailChain) -> Self {
        self.input_guardrails = chain;
        self
    }

    pub fn with_output_guardrails(mut self, chain: OutputGuardrailChain) -> Self {
        self.output_guardrails = chain;
        self
    }

    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn with_request_transform(mut self, transform: RequestTransform) -> Self {
        self.request_transform = Some(transform);
        self
    }

    pub fn with_parameters(mut self, parameters: ChatRequestParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Start a turn.
    ///
    /// Registration and argument problems raise here, synchronously,
    /// before any network call. Everything after that surfaces through
    /// the subscribers and the returned handle.
    pub fn start(&self, request: TurnRequest, subscribers: TurnSubscribers) -> Result<TurnHandle> {
        subscribers.validate()?;
        if request.messages.is_empty() {
            return Err(TurnstileError::InvalidArgument(
                "a turn requires at least one outgoing message".to_string(),
            ));
        }

        let (cancel, abort_rx) = CancellationHandle::new();
        let cancel = Arc::new(cancel);
        let (result_tx, result_rx) = oneshot::channel();

        let worker = TurnWorker {
            model: self.model.clone(),
            tools: self.tools.clone(),
            memory: self.memory.clone(),
            input_guardrails: self.input_guardrails.clone(),
            output_guardrails: self.output_guardrails.clone(),
            listeners: self.listeners.clone(),
            request_transform: self.request_transform.clone(),
            parameters: self.parameters.clone(),
            subscribers,
        };
        let invocation = request.invocation.clone();
        let handle = cancel.clone();
        tokio::spawn(worker.run(request, handle, abort_rx, result_tx));

        Ok(TurnHandle {
            invocation,
            handle: cancel,
            result_rx,
        })
    }
}

enum Outcome {
    Completed(ChatResponse),
    Cancelled,
}

struct TurnWorker {
    model: Arc<dyn StreamingChatModel>,
    tools: ToolExecutor,
    memory: Option<Arc<dyn ChatMemory>>,
    input_guardrails: InputGuardrailChain,
    output_guardrails: OutputGuardrailChain,
    listeners: Arc<ListenerRegistry>,
    request_transform: Option<RequestTransform>,
    parameters: ChatRequestParameters,
    subscribers: TurnSubscribers,
}

impl TurnWorker {
    async fn run(
        self,
        request: TurnRequest,
        handle: Arc<CancellationHandle>,
        mut abort_rx: oneshot::Receiver<()>,
        result_tx: oneshot::Sender<TurnResult>,
    ) {
        let invocation = request.invocation.clone();
        self.listeners.fire(&TurnEvent::TurnStarted {
            invocation: invocation.clone(),
        });

        match self.drive(request, handle, &mut abort_rx).await {
            Ok(Outcome::Completed(response)) => {
                self.listeners
                    .fire(&TurnEvent::TurnCompleted { invocation });
                let _ = result_tx.send(TurnResult::completed(response));
            }
            Ok(Outcome::Cancelled) => {
                self.listeners
                    .fire(&TurnEvent::TurnCancelled { invocation });
                let _ = result_tx.send(TurnResult::cancelled());
            }
            Err(err) => {
                self.listeners.fire(&TurnEvent::TurnFailed {
                    invocation,
                    error: err.to_string(),
                });
                self.deliver_error(&err);
                let _ = result_tx.send(TurnResult::failed(err.to_string()));
            }
        }
    }

    async fn drive(
        &self,
        request: TurnRequest,
        handle: Arc<CancellationHandle>,
        abort_rx: &mut oneshot::Receiver<()>,
    ) -> Result<Outcome> {
        let TurnRequest {
            invocation,
            messages,
            retrieval,
        } = request;
        let mut outgoing = messages;

        let mut conversation =
            Conversation::for_turn(self.memory.clone(), invocation.memory_slot.clone());

        if !self.input_guardrails.is_empty() {
            if let Some(pos) = outgoing.iter().rposition(|m| m.role == Role::User) {
                let original = outgoing[pos].text();
                let guardrail_request = GuardrailRequest::new(original.clone(), invocation.clone())
                    .with_memory(conversation.messages())
                    .with_retrieval(retrieval.clone())
                    .with_listeners(self.listeners.clone());
                let validated = self.input_guardrails.enforce(guardrail_request)?;
                if validated != original {
                    let rewritten = outgoing[pos].clone().with_text(validated);
                    outgoing[pos] = rewritten;
                }
            }
        }

        conversation.append(&outgoing);

        let ctx = TurnContext {
            invocation: invocation.clone(),
            handle: handle.clone() as Arc<dyn StreamingHandle>,
        };

        let tool_specifications = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.specifications())
        };

        let mut tool_rounds = 0usize;
        let mut round = 0usize;
        loop {
            round += 1;

            let mut parameters = self.parameters.clone();
            if parameters.tools.is_none() {
                parameters.tools = tool_specifications.clone();
            }
            let mut chat_request = ChatRequest::new(conversation.messages(), parameters);
            if let Some(transform) = &self.request_transform {
                chat_request = transform(&invocation.memory_slot, chat_request);
            }

            self.listeners.fire(&TurnEvent::RequestIssued {
                invocation: invocation.clone(),
                request: chat_request.clone(),
            });
            if round == 1 {
                if let (Some(retrieved), Some(cb)) = (&retrieval, &self.subscribers.retrieved_context)
                {
                    self.forward(cb(retrieved));
                }
            }

            let mut stream = self
                .model
                .stream_chat(&chat_request)
                .await
                .map_err(map_failure)?;

            let mut text = String::new();
            let mut fragments = ToolCallAccumulator::default();
            let mut completed: Vec<ToolExecutionRequest> = Vec::new();
            let mut response: Option<ChatResponse> = None;

            loop {
                tokio::select! {
                    _ = &mut *abort_rx => {
                        debug!(invocation = %invocation, "turn cancelled mid-stream");
                        return Ok(Outcome::Cancelled);
                    }
                    event = stream.next() => {
                        let Some(event) = event else { break };
                        match event {
                            Ok(StreamEvent::PartialText { text: chunk }) => {
                                text.push_str(&chunk);
                                self.dispatch_text(&ctx, &chunk);
                            }
                            Ok(StreamEvent::PartialThinking { text: chunk }) => {
                                self.dispatch_thinking(&ctx, &chunk);
                            }
                            Ok(StreamEvent::PartialToolCall(fragment)) => {
                                self.dispatch_fragment(&ctx, &fragment);
                                fragments.absorb(fragment);
                            }
                            Ok(StreamEvent::CompleteToolCall(call)) => {
                                completed.push(call);
                            }
                            Ok(StreamEvent::Complete(complete)) => {
                                response = Some(complete);
                                break;
                            }
                            Err(err) => return Err(map_failure(err)),
                        }
                    }
                }
            }

            if handle.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
            let Some(mut response) = response else {
                return Err(TurnstileError::Stream(
                    "stream ended without a terminal event".to_string(),
                ));
            };

            let calls = collect_tool_calls(completed, fragments, &response)?;
            debug!(
                invocation = %invocation,
                round,
                tool_calls = calls.len(),
                text_len = text.len(),
                "round complete"
            );

            if calls.is_empty() {
                if response.text().is_empty() && !text.is_empty() {
                    response = response.with_text(text.clone());
                }
                return self.finish(response, &invocation, &retrieval, &mut conversation);
            }

            tool_rounds += 1;
            if tool_rounds > self.tools.max_rounds() {
                return Err(TurnstileError::ToolRoundsExceeded {
                    limit: self.tools.max_rounds(),
                });
            }
            self.listeners.fire(&TurnEvent::ToolRoundStarted {
                invocation: invocation.clone(),
                round: tool_rounds,
            });
            if let Some(cb) = &self.subscribers.intermediate_response {
                self.forward(cb(&response));
            }

            let mut assistant_content: Vec<ContentPart> = Vec::new();
            if !text.is_empty() {
                assistant_content.push(ContentPart::Text { text: text.clone() });
            }
            for call in &calls {
                assistant_content.push(ContentPart::ToolCall(call.clone()));
            }
            conversation.append(&[ChatMessage {
                role: Role::Assistant,
                content: assistant_content,
                name: None,
                timestamp: Some(chrono::Utc::now()),
            }]);

            for call in &calls {
                if let Some(cb) = &self.subscribers.before_tool_execution {
                    self.forward(cb(call));
                }
                let execution = self.tools.execute(call, &invocation).await?;
                if let Some(cb) = &self.subscribers.tool_executed {
                    self.forward(cb(&execution));
                }
                conversation.append(&[ChatMessage::tool_result(
                    execution.request.id.clone(),
                    execution.result.clone(),
                    execution.is_error,
                )]);
            }
        }
    }

    fn finish(
        &self,
        mut response: ChatResponse,
        invocation: &InvocationContext,
        retrieval: &Option<RetrievalResult>,
        conversation: &mut Conversation,
    ) -> Result<Outcome> {
        if !self.output_guardrails.is_empty() {
            let original = response.text();
            let guardrail_request = GuardrailRequest::new(original.clone(), invocation.clone())
                .with_memory(conversation.messages())
                .with_retrieval(retrieval.clone())
                .with_listeners(self.listeners.clone());
            let validated = self.output_guardrails.enforce(guardrail_request)?;
            if validated != original {
                response = response.with_text(validated);
            }
        }

        conversation.append(&[response.message.clone()]);

        if let Some(cb) = &self.subscribers.complete_response {
            if let Err(err) = cb(&response) {
                warn!(error = %err, "complete-response callback failed");
            }
        }
        Ok(Outcome::Completed(response))
    }

    fn dispatch_text(&self, ctx: &TurnContext, chunk: &str) {
        if let Some(cb) = &self.subscribers.partial_text {
            self.forward(cb(chunk));
        } else if let Some(cb) = &self.subscribers.partial_text_with_context {
            self.forward(cb(ctx, chunk));
        }
    }

    fn dispatch_thinking(&self, ctx: &TurnContext, chunk: &str) {
        if let Some(cb) = &self.subscribers.partial_thinking {
            self.forward(cb(chunk));
        } else if let Some(cb) = &self.subscribers.partial_thinking_with_context {
            self.forward(cb(ctx, chunk));
        }
    }

    fn dispatch_fragment(&self, ctx: &TurnContext, fragment: &crate::types::ToolCallFragment) {
        if let Some(cb) = &self.subscribers.partial_tool_call {
            self.forward(cb(fragment));
        } else if let Some(cb) = &self.subscribers.partial_tool_call_with_context {
            self.forward(cb(ctx, fragment));
        }
    }

    /// Route a per-event callback failure to the error path without
    /// stopping delivery of subsequent events.
    fn forward(&self, outcome: Result<()>) {
        if let Err(err) = outcome {
            warn!(error = %err, "subscriber callback failed");
            self.deliver_error(&err);
        }
    }

    fn deliver_error(&self, err: &TurnstileError) {
        if self.subscribers.ignore_errors {
            debug!(error = %err, "turn error swallowed (ignore-errors)");
            return;
        }
        if let Some(cb) = &self.subscribers.error {
            if cb(err).is_err() {
                warn!("error callback itself failed");
            }
        }
    }
}

/// Merge directly-completed calls, fragment reconstructions, and calls
/// carried in the response message, deduplicated.
fn collect_tool_calls(
    completed: Vec<ToolExecutionRequest>,
    fragments: ToolCallAccumulator,
    response: &ChatResponse,
) -> Result<Vec<ToolExecutionRequest>> {
    let mut calls = completed;
    let mut seen: HashSet<String> = calls.iter().map(call_key).collect();

    for call in fragments.finish()? {
        if seen.insert(call_key(&call)) {
            calls.push(call);
        }
    }
    for call in response.tool_calls() {
        if seen.insert(call_key(call)) {
            calls.push(call.clone());
        }
    }
    Ok(calls)
}

fn call_key(call: &ToolExecutionRequest) -> String {
    match &call.id {
        Some(id) => id.clone(),
        None => format!("{}#{}", call.name, call.arguments),
    }
}
