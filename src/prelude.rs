//! Convenience re-exports for common use.

pub use crate::context::{InvocationContext, MemorySlot};
pub use crate::error::{Result, TurnstileError};
pub use crate::executor::{ChatExecutor, DirectChatExecutor, StreamingChatExecutor};
pub use crate::guardrail::{
    Guardrail, GuardrailRequest, GuardrailResult, InputGuardrailChain, OutputGuardrailChain,
};
pub use crate::memory::{ChatMemory, InMemoryChatMemory};
pub use crate::model::{ChatModel, ChatStream, StreamingChatModel, StreamingHandle};
pub use crate::tools::{Tool, ToolArguments, ToolExecutor, ToolSpecification};
pub use crate::turn::{
    TurnHandle, TurnOrchestrator, TurnRequest, TurnResult, TurnStatus, TurnSubscribers,
};
pub use crate::types::{
    ChatMessage, ChatRequest, ChatRequestParameters, ChatResponse, ContentPart, Role, StreamEvent,
    ToolExecutionRequest,
};
