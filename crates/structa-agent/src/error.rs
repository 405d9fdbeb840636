//! Self-correction error taxonomy.
//!
//! None of these reach the caller of [`crate::Agent::add_user_message`]: each
//! one renders to a JSON payload that goes back to the model as feedback.

use serde_json::{json, Map, Value};
use thiserror::Error;

/// A proposed function call that could not be validated or executed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("function `{name}` does not exist")]
    InvalidFunction { name: String, valid: Vec<String> },

    #[error("invalid arguments (missing: {missing:?}, invalid: {invalid:?})")]
    InvalidArguments {
        /// Rendered schema of the called function.
        schema: Value,
        missing: Vec<String>,
        invalid: Vec<String>,
    },

    #[error("execution failed: {detail}")]
    ExecutionFailed { schema: Value, detail: String },
}

impl CallError {
    /// JSON payload placed in the `error` field of a `function_call_error`.
    pub fn to_payload(&self) -> Value {
        match self {
            CallError::InvalidFunction { name, valid } => json!({
                "error": "INVALID FUNCTION",
                "details": format!("Function `{name}` does not exist"),
                "valid_functions": valid,
                "required_action": "Revise your response to call one of the valid_functions",
            }),
            CallError::InvalidArguments {
                schema,
                missing,
                invalid,
            } => {
                let mut details = Map::new();
                if !missing.is_empty() {
                    details.insert("missing_arguments".to_string(), json!(missing));
                }
                if !invalid.is_empty() {
                    details.insert("invalid_arguments".to_string(), json!(invalid));
                }
                json!({
                    "error": "INVALID ARGUMENTS",
                    "details": details,
                    "correct_function_schema": schema,
                    "required_action": "Revise your response to include all required arguments and remove any invalid ones",
                })
            }
            CallError::ExecutionFailed { schema, detail } => json!({
                "error": "EXECUTION FAILED",
                "details": detail,
                "correct_function_schema": schema,
                "required_action": "Revise your arguments",
            }),
        }
    }
}

/// Raw model text that no extraction strategy could turn into a decision.
#[derive(Debug, Error)]
#[error("malformed response: {}", .details.as_deref().unwrap_or("no JSON object found"))]
pub struct MalformedResponse {
    /// Shape problem of the last parsed candidate, if any parsed at all.
    pub details: Option<String>,
    /// The response-format contract the model was given.
    pub expected_format: String,
}

impl MalformedResponse {
    /// JSON payload placed in the `error` field of a `format_error`.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("error".to_string(), json!("MALFORMED RESPONSE"));
        payload.insert(
            "error_message".to_string(),
            json!("Your response is not a valid JSON"),
        );
        if let Some(ref details) = self.details {
            payload.insert("details".to_string(), json!(details));
        }
        payload.insert("expected_format".to_string(), json!(self.expected_format));
        payload.insert(
            "required_action".to_string(),
            json!("Reformat your entire response to match the expected_format"),
        );
        Value::Object(payload)
    }
}

/// Failure of the full extraction chain, fixer pass included.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),

    /// The fixer completion itself failed at the transport level.
    #[error("fixer completion failed: {0}")]
    Transport(#[source] anyhow::Error),
}
