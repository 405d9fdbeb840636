//! Tool trait — the interface every callable exposed to the model implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::schema::{ParameterSpec, ToolSchema, TypeTag};

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// An in-process callable the model may invoke by name.
///
/// The agent builds a [`ToolSchema`] from `name()`, `description()`,
/// `parameters()` and `return_type()` once at construction, validates each
/// proposed call against it, and only then dispatches to `call()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool (e.g. `"web_search"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Declared parameters, in the order they should be rendered.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Declared return type. Undeclared returns render as `unknown`.
    fn return_type(&self) -> TypeTag {
        TypeTag::Unknown
    }

    /// Run the tool with already-validated arguments.
    ///
    /// Errors are reported back to the model as an execution failure; they
    /// never end the conversation.
    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value>;

    /// Build the schema. Default implementation — rarely needs overriding.
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            self.name(),
            self.description(),
            self.parameters(),
            self.return_type(),
        )
    }
}

// ─────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────

/// Extract a required string argument.
pub fn require_string(args: &Map<String, Value>, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required string argument: {key}"))
}

/// Extract an optional string argument.
pub fn optional_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Extract an optional integer argument.
pub fn optional_i64(args: &Map<String, Value>, key: &str) -> Option<i64> {
    args.get(key).and_then(|v| v.as_i64())
}

/// Extract a required number argument, accepting ints and floats.
pub fn require_f64(args: &Map<String, Value>, key: &str) -> anyhow::Result<f64> {
    args.get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow::anyhow!("Missing required number argument: {key}"))
}
