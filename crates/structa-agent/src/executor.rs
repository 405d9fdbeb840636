//! Execution Engine — runs validated calls with failures isolated.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CallError;
use crate::schema::ToolSchema;
use crate::tools::Tool;

/// Dispatches calls by name. Each call runs in its own tokio task so that a
/// panicking tool is reported like any other failure.
pub struct ExecutionEngine {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ExecutionEngine {
    /// Later tools replace earlier ones with the same name.
    pub fn new(tools: &[Arc<dyn Tool>]) -> Self {
        let tools = tools
            .iter()
            .map(|tool| (tool.name().to_string(), Arc::clone(tool)))
            .collect();
        Self { tools }
    }

    /// Invoke the tool described by `schema`.
    ///
    /// Tool errors and panics come back as [`CallError::ExecutionFailed`]
    /// carrying the schema of the failed call.
    pub async fn execute(
        &self,
        schema: &ToolSchema,
        arguments: Map<String, Value>,
    ) -> Result<Value, CallError> {
        let failed = |detail: String| CallError::ExecutionFailed {
            schema: schema.to_json(),
            detail,
        };

        let tool = self
            .tools
            .get(&schema.name)
            .cloned()
            .ok_or_else(|| failed(format!("No callable registered for `{}`", schema.name)))?;

        debug!(tool = %schema.name, "executing tool");
        let handle = tokio::spawn(async move { tool.call(arguments).await });

        match handle.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(tool = %schema.name, error = %e, "tool returned an error");
                Err(failed(format!("{e:#}")))
            }
            Err(join_err) => {
                let detail = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                warn!(tool = %schema.name, error = %detail, "tool panicked");
                Err(failed(detail))
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}
