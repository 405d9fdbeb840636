//! Tool interface and the built-in tool implementations.

pub mod base;
pub mod finish;
pub mod function;

pub use base::{optional_i64, optional_string, require_f64, require_string, Tool};
pub use finish::{FinishConversation, FINISH_TOOL_NAME};
pub use function::{FunctionTool, ToolFunction};
