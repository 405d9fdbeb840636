//! The termination tool, registered on every agent.

use async_trait::async_trait;
use serde_json::{Map, Value};

use anyhow::Context;

use super::base::Tool;
use crate::schema::{ParameterSpec, TypeTag};

/// Name of the tool whose successful call ends a turn.
pub const FINISH_TOOL_NAME: &str = "finish_conversation";

/// `finish_conversation(final_answer: str) -> str`
///
/// Returns its argument unchanged, whatever its JSON type; the agent loop
/// uses the result as the turn's answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FinishConversation;

#[async_trait]
impl Tool for FinishConversation {
    fn name(&self) -> &str {
        FINISH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Ends up conversation with user by providing the final_answer. \
         The final_answer should contains all detailed information and citations."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("final_answer", TypeTag::Str)]
    }

    fn return_type(&self) -> TypeTag {
        TypeTag::Str
    }

    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        args.get("final_answer")
            .cloned()
            .context("Missing required argument: final_answer")
    }
}
