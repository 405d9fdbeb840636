//! Prompt Compiler — renders the system messages an agent sends with every request.
//!
//! Templates are plain text with named placeholders:
//! `{system_prompt}`, `{response_format}`, `{function_names}`,
//! `{function_signatures}` and `{function_schemas}`. Any other brace text is
//! left as-is, so templates may contain literal JSON.

use serde_json::json;
use structa_core::types::Message;

use crate::schema::SchemaRegistry;
use crate::tools::FINISH_TOOL_NAME;

/// Persona used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Persona of the JSON fixer pass.
pub const DEFAULT_FIXER_SYSTEM_PROMPT: &str =
    "You are a JSON fixer. You turn any input into a valid JSON object of the required format.";

/// Main system message template.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "{system_prompt}

You act only by calling functions. Every reply MUST be a single JSON object with exactly this structure:
{response_format}

Any other structure is an error. Do not add prose, markdown or code fences around the object.

Valid function names: {function_names}
Never call a function outside this list, even if its name looks close.

Available functions:
{function_signatures}

Full function schemas:
{function_schemas}

After each call you receive a JSON feedback message:
- `function_call_ok` carries the result of your call.
- `format_error` and `function_call_error` describe what went wrong. Read the `error` field, follow its `required_action` and retry with a corrected response.

When you have everything needed, call `finish_conversation` with the complete answer.";

/// Fixer system message template.
pub const DEFAULT_FIXER_TEMPLATE: &str = "{system_prompt}

Rewrite the message you are given into a single JSON object with exactly this structure:
{response_format}

Valid function names: {function_names}

Available functions:
{function_signatures}

Reply with the JSON object only. Keep the intent of the original message. If it is a plain answer to the human, call `finish_conversation` with that answer.";

/// Both compiled system messages plus the format contract they embed.
#[derive(Clone, Debug)]
pub struct CompiledPrompt {
    pub system_message: String,
    pub fixer_message: String,
    pub response_format: String,
}

/// Holds personas and templates; compiled once per agent.
#[derive(Clone, Debug)]
pub struct PromptCompiler {
    pub system_prompt: String,
    pub template: String,
    pub fixer_system_prompt: String,
    pub fixer_template: String,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            fixer_system_prompt: DEFAULT_FIXER_SYSTEM_PROMPT.to_string(),
            fixer_template: DEFAULT_FIXER_TEMPLATE.to_string(),
        }
    }
}

impl PromptCompiler {
    pub fn compile(&self, registry: &SchemaRegistry) -> CompiledPrompt {
        let response_format = response_format(&registry.names());
        let function_names = registry
            .names()
            .iter()
            .map(|n| format!("`{n}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let signatures = registry.render_signatures();
        let schemas = registry.render_schemas();

        let render = |template: &str, persona: &str| {
            render_template(
                template,
                &[
                    ("system_prompt", persona),
                    ("response_format", &response_format),
                    ("function_names", &function_names),
                    ("function_signatures", &signatures),
                    ("function_schemas", &schemas),
                ],
            )
        };

        CompiledPrompt {
            system_message: render(&self.template, &self.system_prompt),
            fixer_message: render(&self.fixer_template, &self.fixer_system_prompt),
            response_format,
        }
    }
}

/// The decision shape the model must imitate, with the valid names inlined.
pub fn response_format(function_names: &[String]) -> String {
    let names = function_names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let format = json!({
        "thought": "<your plan and reasoning to choose an action>",
        "function": format!("<function name, SHOULD STRICTLY be one of these: {names}>"),
        "arguments": {
            "<argument-1>": "<value-1>",
            "<argument-2>": "<value-2>",
        },
    });
    format.to_string()
}

/// Fixed exchange placed between the system message and the history.
pub fn example_exchange() -> [Message; 2] {
    let decision = json!({
        "thought": "User has greet me, I should say hi.",
        "function": FINISH_TOOL_NAME,
        "arguments": {
            "final_answer": "Hi, I'm a useful assistant, I'm ready to help.",
        },
    });
    [Message::user("Hi"), Message::assistant(decision.to_string())]
}

/// Single-pass placeholder substitution. Substituted text is never rescanned.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replaced = after.find('}').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match replaced {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FinishConversation, Tool};
    use std::sync::Arc;

    fn registry() -> SchemaRegistry {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(FinishConversation)];
        SchemaRegistry::from_tools(&tools)
    }

    #[test]
    fn test_render_template_leaves_unknown_braces() {
        let out = render_template(
            "{a} and {\"json\": 1} and {b}",
            &[("a", "A {b}"), ("b", "B")],
        );
        assert_eq!(out, "A {b} and {\"json\": 1} and B");
    }

    #[test]
    fn test_render_template_unclosed_brace() {
        assert_eq!(render_template("x { y", &[("y", "z")]), "x { y");
    }

    #[test]
    fn test_response_format() {
        let format = response_format(&["a".into(), "b".into()]);
        assert!(format.starts_with("{\"thought\":"));
        assert!(format.contains("SHOULD STRICTLY be one of these: `a`, `b`"));
        assert!(format.contains("\"<argument-1>\":\"<value-1>\""));
    }

    #[test]
    fn test_compile_embeds_contract() {
        let compiled = PromptCompiler::default().compile(&registry());
        let msg = &compiled.system_message;
        assert!(msg.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(msg.contains(&compiled.response_format));
        assert!(msg.contains("Any other structure is an error"));
        assert!(msg.contains("Valid function names: `finish_conversation`"));
        assert!(msg.contains("- finish_conversation(final_answer: str) -> str"));
        assert!(msg.contains("required_action"));
        assert!(!msg.contains("{function_schemas}"));
    }

    #[test]
    fn test_compile_fixer_uses_own_persona() {
        let compiler = PromptCompiler {
            fixer_system_prompt: "Fix it.".into(),
            ..Default::default()
        };
        let compiled = compiler.compile(&registry());
        assert!(compiled.fixer_message.starts_with("Fix it."));
        assert!(compiled.fixer_message.contains(&compiled.response_format));
    }

    #[test]
    fn test_example_exchange() {
        let [user, assistant] = example_exchange();
        assert_eq!(user.content, "Hi");
        let decision: serde_json::Value = serde_json::from_str(&assistant.content).unwrap();
        assert_eq!(decision["function"], FINISH_TOOL_NAME);
    }
}
