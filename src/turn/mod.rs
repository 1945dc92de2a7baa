//! Turn orchestration: subscribers, events, the tool-call accumulator,
//! and the orchestrator that drives one exchange end to end.

pub mod accumulator;
pub mod events;
pub mod orchestrator;
pub mod subscribers;
pub mod types;

pub use accumulator::ToolCallAccumulator;
pub use events::{ListenerRegistry, TurnEvent, TurnListener};
pub use orchestrator::{RequestTransform, TurnHandle, TurnOrchestrator, TurnRequest};
pub use subscribers::{TurnContext, TurnSubscribers};
pub use types::{TurnResult, TurnStatus};
