//! Function-Call Validator — checks a decision against the registered schemas
//! without executing anything.

use serde_json::{Map, Value};

use crate::error::CallError;
use crate::schema::{SchemaRegistry, ToolSchema};

/// Resolve `function` and check `arguments` against its schema.
///
/// Missing and unknown arguments are reported together in one
/// [`CallError::InvalidArguments`].
pub fn validate_call<'a>(
    registry: &'a SchemaRegistry,
    function: &str,
    arguments: &Map<String, Value>,
) -> Result<&'a ToolSchema, CallError> {
    let schema = registry
        .get(function)
        .ok_or_else(|| CallError::InvalidFunction {
            name: function.to_string(),
            valid: registry.names(),
        })?;

    let missing: Vec<String> = schema
        .required_parameters()
        .filter(|p| !arguments.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();

    let invalid: Vec<String> = arguments
        .keys()
        .filter(|key| schema.parameter(key).is_none())
        .cloned()
        .collect();

    if missing.is_empty() && invalid.is_empty() {
        Ok(schema)
    } else {
        Err(CallError::InvalidArguments {
            schema: schema.to_json(),
            missing,
            invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParameterSpec, TypeTag};
    use crate::tools::{FunctionTool, Tool};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> SchemaRegistry {
        let f = FunctionTool::new("f", "Test function.", |_| Ok(Value::Null))
            .param(ParameterSpec::required("a", TypeTag::Int))
            .param(ParameterSpec::optional("b", TypeTag::Int, json!(5)));
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(f)];
        SchemaRegistry::from_tools(&tools)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_call() {
        let reg = registry();
        assert_eq!(validate_call(&reg, "f", &args(json!({"a": 1}))).unwrap().name, "f");
        assert!(validate_call(&reg, "f", &args(json!({"a": 1, "b": 2}))).is_ok());
    }

    #[test]
    fn test_unknown_function() {
        let reg = registry();
        match validate_call(&reg, "g", &Map::new()) {
            Err(CallError::InvalidFunction { name, valid }) => {
                assert_eq!(name, "g");
                assert_eq!(valid, vec!["f".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_argument() {
        let reg = registry();
        match validate_call(&reg, "f", &Map::new()) {
            Err(CallError::InvalidArguments { missing, invalid, .. }) => {
                assert_eq!(missing, vec!["a".to_string()]);
                assert!(invalid.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_extra_argument() {
        let reg = registry();
        match validate_call(&reg, "f", &args(json!({"a": 1, "c": 2}))) {
            Err(CallError::InvalidArguments { missing, invalid, .. }) => {
                assert!(missing.is_empty());
                assert_eq!(invalid, vec!["c".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_extra_reported_together() {
        let reg = registry();
        match validate_call(&reg, "f", &args(json!({"c": 2}))) {
            Err(CallError::InvalidArguments { missing, invalid, .. }) => {
                assert_eq!(missing, vec!["a".to_string()]);
                assert_eq!(invalid, vec!["c".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
