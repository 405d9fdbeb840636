//! Function tools — wrap plain closures (sync or async) as [`Tool`]s.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::base::Tool;
use crate::schema::{ParameterSpec, TypeTag};

type BoxFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// Boxed async callable invoked with validated arguments.
pub type ToolFunction = Box<dyn Fn(Map<String, Value>) -> BoxFuture + Send + Sync>;

/// A tool backed by a closure, with explicitly declared parameters.
///
/// ```
/// use serde_json::json;
/// use structa_agent::schema::{ParameterSpec, TypeTag};
/// use structa_agent::tools::{require_f64, FunctionTool};
///
/// let add = FunctionTool::new("add", "Add two numbers.", |args| {
///     Ok(json!(require_f64(&args, "a")? + require_f64(&args, "b")?))
/// })
/// .param(ParameterSpec::required("a", TypeTag::Float))
/// .param(ParameterSpec::required("b", TypeTag::Float))
/// .returns(TypeTag::Float);
/// ```
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    return_type: TypeTag,
    function: ToolFunction,
}

impl FunctionTool {
    /// Wrap a synchronous function.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let function: ToolFunction = Box::new(move |args| {
            let result = f(args);
            Box::pin(async move { result })
        });
        Self::from_boxed(name, description, function)
    }

    /// Wrap an asynchronous function.
    pub fn new_async<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::from_boxed(name, description, Box::new(move |args| Box::pin(f(args))))
    }

    fn from_boxed(name: impl Into<String>, description: impl Into<String>, function: ToolFunction) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            return_type: TypeTag::Unknown,
            function,
        }
    }

    /// Declare the next parameter (builder pattern).
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Declare the return type (builder pattern).
    pub fn returns(mut self, return_type: TypeTag) -> Self {
        self.return_type = return_type;
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        self.parameters.clone()
    }

    fn return_type(&self) -> TypeTag {
        self.return_type.clone()
    }

    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        (self.function)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::base::require_string;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_sync_function() {
        let tool = FunctionTool::new("upper", "Uppercase text.", |args| {
            Ok(json!(require_string(&args, "text")?.to_uppercase()))
        })
        .param(ParameterSpec::required("text", TypeTag::Str))
        .returns(TypeTag::Str);

        assert_eq!(tool.schema().signature(), "upper(text: str) -> str");
        assert_eq!(tool.call(args(json!({"text": "ab"}))).await.unwrap(), json!("AB"));
    }

    #[tokio::test]
    async fn test_async_function() {
        let tool = FunctionTool::new_async("later", "Answer after a yield.", |args| async move {
            tokio::task::yield_now().await;
            Ok(json!(args.len()))
        });

        assert_eq!(tool.call(args(json!({"a": 1, "b": 2}))).await.unwrap(), json!(2));
        assert_eq!(tool.schema().return_type, TypeTag::Unknown);
    }

    #[tokio::test]
    async fn test_function_error_propagates() {
        let tool = FunctionTool::new("fail", "Always fails.", |_| anyhow::bail!("boom"));
        let err = tool.call(Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
