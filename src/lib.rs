//! Turnstile: conversational turn orchestration.
//!
//! Drives one logical exchange with a language model end to end: guardrail
//! chains around the user message and the generated text, streamed event
//! dispatch to registered subscribers, a bounded tool-invocation loop, and
//! cooperative cancellation. Wire-level provider clients stay outside this
//! crate and plug in through the [`model`] traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnstile::prelude::*;
//!
//! # async fn example(model: Arc<dyn turnstile::model::StreamingChatModel>) -> turnstile::error::Result<()> {
//! let orchestrator = TurnOrchestrator::new(model);
//! let subscribers = TurnSubscribers::new()
//!     .on_partial_text(|chunk| {
//!         print!("{chunk}");
//!         Ok(())
//!     })
//!     .on_error(|err| {
//!         eprintln!("turn failed: {err}");
//!         Ok(())
//!     });
//!
//! let handle = orchestrator.start(
//!     TurnRequest::new(vec![ChatMessage::user("Hello!")]),
//!     subscribers,
//! )?;
//! let result = handle.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod guardrail;
pub mod memory;
pub mod model;
pub mod prelude;
pub mod tools;
pub mod turn;
pub mod types;
