//! Structured Response Extractor.
//!
//! Raw model text goes through three local strategies, in order, stopping at
//! the first candidate that has the decision shape:
//!
//! 1. the whole text, through a tolerant JSON parser
//! 2. the interior of a ```` ``` ```` / ```` ```json ```` fence
//! 3. the first balanced `{...}` span
//!
//! When all three fail, [`ResponseExtractor`] asks the model once more, through
//! the fixer system message, and reruns the local chain on that output.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use structa_core::types::Message;
use structa_providers::{CompletionConfig, CompletionProvider};

use crate::error::{ExtractError, MalformedResponse};

// ─────────────────────────────────────────────
// AgentDecision
// ─────────────────────────────────────────────

/// One parsed model turn: the reasoning plus the function it wants called.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    pub thought: String,
    /// Name of the function to call.
    pub function: String,
    pub arguments: Map<String, Value>,
}

impl AgentDecision {
    /// Check the structural shape of a parsed value. Extra keys are ignored;
    /// whether the function exists is not checked here.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "The response is not a JSON object".to_string())?;

        let thought = string_field(obj, "thought")?;
        let function = string_field(obj, "function")?;
        let arguments = match obj.get("arguments") {
            None => return Err("The `arguments` field is missing".to_string()),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err("The `arguments` field is not an object".to_string()),
        };

        Ok(Self {
            thought,
            function,
            arguments,
        })
    }

    /// Compact JSON form, as stored in the conversation.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key) {
        None => Err(format!("The `{key}` field is missing")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("The `{key}` field is not a string")),
    }
}

// ─────────────────────────────────────────────
// Local strategies
// ─────────────────────────────────────────────

static FENCE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?[ \t]*\r?\n?(\{.*?\})\s*```").ok());

/// Result of running the local strategies on one text.
#[derive(Debug)]
pub enum LocalOutcome {
    Decision(AgentDecision),
    /// Nothing matched. Holds the shape problem of the last parsed candidate.
    Failed(Option<String>),
}

/// Run the three local strategies. Never panics, never calls the model.
pub fn extract_local(raw: &str) -> LocalOutcome {
    let mut last_problem = None;

    let mut attempt = |strategy: &str, candidate: &str| -> Option<AgentDecision> {
        let value = parse_tolerant(candidate)?;
        match AgentDecision::from_value(&value) {
            Ok(decision) => {
                debug!(strategy, "extracted decision");
                Some(decision)
            }
            Err(problem) => {
                debug!(strategy, problem = %problem, "candidate rejected");
                last_problem = Some(problem);
                None
            }
        }
    };

    if let Some(decision) = attempt("whole_text", raw) {
        return LocalOutcome::Decision(decision);
    }

    for block in fenced_blocks(raw) {
        if let Some(decision) = attempt("fenced_block", block) {
            return LocalOutcome::Decision(decision);
        }
    }

    if let Some(span) = first_balanced_object(raw) {
        if let Some(decision) = attempt("brace_scan", span) {
            return LocalOutcome::Decision(decision);
        }
    }

    LocalOutcome::Failed(last_problem)
}

/// Interiors of every ```` ``` ```` / ```` ```json ```` fence holding an object.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let Some(re) = FENCE_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// First `{...}` span whose braces balance, ignoring braces inside single- or
/// double-quoted literals. `None` when the first opening brace never closes.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if let Some(q) = quote {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse, then one repair pass for the usual model slips.
///
/// The repair drops trailing commas, strips `//` comments, maps
/// `True`/`False`/`None`, rewrites single-quoted strings and quotes bare
/// keys, all outside double-quoted literals. Missing closing braces are
/// never invented.
pub fn parse_tolerant(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let repaired = repair_json(text);
    if repaired == text {
        return None;
    }
    serde_json::from_str(&repaired).ok()
}

fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '\'' => {
                i = push_single_quoted(&chars, i, &mut out);
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word_end = chars[i..]
                    .iter()
                    .position(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
                    .map_or(chars.len(), |p| i + p);
                let word: String = chars[i..word_end].iter().collect();
                let is_key = chars[word_end..].iter().find(|c| !c.is_whitespace()) == Some(&':');
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" => "null",
                        other => other,
                    });
                }
                i = word_end;
                continue;
            }
            _ => out.push(ch),
        }
        i += 1;
    }
    out
}

/// Re-emit the `'...'` literal starting at `start` as a JSON string and
/// return the index just past it. An unterminated literal is copied as is.
fn push_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut body = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&'\'') => {
                body.push('\'');
                i += 2;
            }
            '\\' => {
                body.push('\\');
                if let Some(next) = chars.get(i + 1) {
                    body.push(*next);
                }
                i += 2;
            }
            '"' => {
                body.push_str("\\\"");
                i += 1;
            }
            '\'' => {
                out.push('"');
                out.push_str(&body);
                out.push('"');
                return i + 1;
            }
            c => {
                body.push(c);
                i += 1;
            }
        }
    }
    out.extend(&chars[start..]);
    chars.len()
}

// ─────────────────────────────────────────────
// ResponseExtractor (local chain + fixer pass)
// ─────────────────────────────────────────────

/// Full extraction chain, including the single fixer completion.
pub struct ResponseExtractor {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    completion: CompletionConfig,
    fixer_message: String,
    response_format: String,
}

impl ResponseExtractor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        completion: CompletionConfig,
        fixer_message: impl Into<String>,
        response_format: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            completion,
            fixer_message: fixer_message.into(),
            response_format: response_format.into(),
        }
    }

    /// Turn raw model text into a decision.
    ///
    /// `user_message` is the human message of the current turn; it seeds the
    /// fixer prompt.
    pub async fn extract(&self, raw: &str, user_message: &str) -> Result<AgentDecision, ExtractError> {
        let first_problem = match extract_local(raw) {
            LocalOutcome::Decision(decision) => return Ok(decision),
            LocalOutcome::Failed(problem) => problem,
        };

        warn!(
            problem = first_problem.as_deref().unwrap_or("no JSON object"),
            "local extraction failed, running fixer pass"
        );

        let request = [
            Message::system(self.fixer_message.as_str()),
            Message::user(format!(
                "Original query from human:\n{user_message}\nFix the following LLM message:\n{raw}"
            )),
        ];
        let fixed = self
            .provider
            .complete(&self.model, &request, &self.completion)
            .await
            .map_err(ExtractError::Transport)?;

        match extract_local(&fixed) {
            LocalOutcome::Decision(decision) => {
                debug!("fixer pass recovered a decision");
                Ok(decision)
            }
            LocalOutcome::Failed(problem) => Err(MalformedResponse {
                details: problem.or(first_problem),
                expected_format: self.response_format.clone(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decision() -> AgentDecision {
        AgentDecision {
            thought: "look it up".into(),
            function: "search".into(),
            arguments: json!({"query": "rust {braces}"}).as_object().cloned().unwrap(),
        }
    }

    fn expect_decision(raw: &str) -> AgentDecision {
        match extract_local(raw) {
            LocalOutcome::Decision(d) => d,
            LocalOutcome::Failed(p) => panic!("expected a decision, got {p:?}"),
        }
    }

    #[test]
    fn test_bare_json() {
        let raw = decision().to_json_string();
        assert_eq!(expect_decision(&raw), decision());
    }

    #[test]
    fn test_fenced_json() {
        let raw = format!(
            "Sure, here it is:\n```json\n{}\n```\nDone.",
            decision().to_json_string()
        );
        assert_eq!(expect_decision(&raw), decision());
    }

    #[test]
    fn test_untagged_fence() {
        let raw = format!("```\n{}\n```", decision().to_json_string());
        assert_eq!(expect_decision(&raw), decision());
    }

    #[test]
    fn test_prose_with_braces() {
        let raw = format!(
            "I will call a function now. {} Hope that helps.",
            decision().to_json_string()
        );
        assert_eq!(expect_decision(&raw), decision());
    }

    #[test]
    fn test_tolerant_repairs() {
        let raw = r#"{
            "thought": "ok", // reasoning
            "function": "search",
            "arguments": {"query": "a, }", "exact": True, "limit": None,},
        }"#;
        let d = expect_decision(raw);
        assert_eq!(d.arguments["exact"], json!(true));
        assert_eq!(d.arguments["limit"], Value::Null);
        assert_eq!(d.arguments["query"], "a, }");
    }

    #[test]
    fn test_repair_leaves_strings_alone() {
        let repaired = repair_json(r#"{"a": "True // not a comment",}"#);
        assert_eq!(repaired, r#"{"a": "True // not a comment"}"#);
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        let raw = r#"{"thought": "x", "function": "f", "arguments": {"a": 1}"#;
        assert!(matches!(extract_local(raw), LocalOutcome::Failed(_)));
        assert!(first_balanced_object(raw).is_none());
    }

    #[test]
    fn test_shape_problem_is_reported() {
        let raw = r#"{"function": "f", "arguments": {}}"#;
        match extract_local(raw) {
            LocalOutcome::Failed(Some(problem)) => {
                assert_eq!(problem, "The `thought` field is missing")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_shape_failure_falls_through_to_next_strategy() {
        let raw = format!(
            "```json\n{{\"note\": 1}}\n```\nand\n```json\n{}\n```",
            decision().to_json_string()
        );
        assert_eq!(expect_decision(&raw), decision());
    }

    #[test]
    fn test_shape_checks() {
        assert_eq!(
            AgentDecision::from_value(&json!({"thought": 1, "function": "f", "arguments": {}}))
                .unwrap_err(),
            "The `thought` field is not a string"
        );
        assert_eq!(
            AgentDecision::from_value(&json!({"thought": "t", "function": "f", "arguments": []}))
                .unwrap_err(),
            "The `arguments` field is not an object"
        );
        assert!(AgentDecision::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_brace_scan_ignores_string_braces() {
        let text = r#"noise {"a": "}{", "b": {"c": "\"}"}} tail }"#;
        assert_eq!(
            first_balanced_object(text),
            Some(r#"{"a": "}{", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn test_python_dict_quotes() {
        let raw = "{'thought': 'done', 'function': 'finish_conversation', \
                   'arguments': {'final_answer': 'say \\'hi\\' and \"bye\"'}}";
        let d = expect_decision(raw);
        assert_eq!(d.function, "finish_conversation");
        assert_eq!(d.arguments["final_answer"], "say 'hi' and \"bye\"");
    }

    #[test]
    fn test_unquoted_keys() {
        let raw = r#"{thought: "done", function: "finish_conversation", arguments: {final_answer: "42", ok: True}}"#;
        let d = expect_decision(raw);
        assert_eq!(d.thought, "done");
        assert_eq!(d.arguments["final_answer"], "42");
        assert_eq!(d.arguments["ok"], json!(true));
    }

    #[test]
    fn test_python_dict_inside_prose() {
        let raw = "Let me finish. {'thought': 'a } b', 'function': 'f', 'arguments': {}} bye";
        assert_eq!(
            first_balanced_object(raw),
            Some("{'thought': 'a } b', 'function': 'f', 'arguments': {}}")
        );
        assert_eq!(expect_decision(raw).thought, "a } b");
    }

    #[test]
    fn test_unbalanced_python_dict_still_fails() {
        let raw = "{'thought': 'x', 'function': 'f', 'arguments': {'a': 1}";
        assert!(matches!(extract_local(raw), LocalOutcome::Failed(_)));
    }
}
