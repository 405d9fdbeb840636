//! Structa Agent — a structured tool-calling loop over free-text completions.
//!
//! This crate contains:
//! - **tools**: the `Tool` trait, closure-backed `FunctionTool`, the built-in termination tool
//! - **schema**: typed parameter descriptors and the schema registry
//! - **prompt**: system message compilation
//! - **extract**: raw text → `AgentDecision`, with the fixer pass
//! - **validate** / **executor**: checking and running proposed calls
//! - **agent**: the loop controller

pub mod agent;
pub mod error;
pub mod executor;
pub mod extract;
pub mod prompt;
pub mod schema;
pub mod tools;
pub mod validate;

pub use agent::{Agent, AgentBuilder, TurnOutcome, DEFAULT_MAX_ITERATIONS, PROMPT_LOG_TARGET};
pub use error::{CallError, ExtractError, MalformedResponse};
pub use extract::AgentDecision;
pub use prompt::PromptCompiler;
pub use schema::{ParameterSpec, SchemaRegistry, ToolSchema, TypeTag};
pub use tools::{FinishConversation, FunctionTool, Tool, FINISH_TOOL_NAME};
