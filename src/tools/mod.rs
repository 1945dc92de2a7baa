//! Tool system: declared specifications, typed arguments, bounded
//! execution.

pub mod arguments;
pub mod executor;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use executor::{
    abort_error_handler, default_error_handler, ToolErrorAction, ToolErrorHandler, ToolExecution,
    ToolExecutor, DEFAULT_MAX_TOOL_ROUNDS,
};
pub use tool::{tool_error, FnTool, Tool, ToolContext};
pub use types::ToolSpecification;
