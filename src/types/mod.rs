//! Core types for Turnstile.

pub mod message;
pub mod request;
pub mod response;
pub mod retrieval;
pub mod stream;

pub use message::*;
pub use request::*;
pub use response::*;
pub use retrieval::*;
pub use stream::*;
