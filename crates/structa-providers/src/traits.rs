//! Completion provider trait — the boundary between the agent and an LLM.
//!
//! The agent treats a completion as an opaque call: model identifier plus
//! ordered message list in, generated text out. Every backend implements
//! [`CompletionProvider`]; [`crate::HttpProvider`] covers OpenAI-compatible APIs.

use async_trait::async_trait;
use serde_json::{Map, Value};
use structa_core::types::Message;

/// Optional provider kwargs passed with each completion call.
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Extra request-body fields forwarded verbatim (e.g. `top_p`, `seed`).
    pub extra: Map<String, Value>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            extra: Map::new(),
        }
    }
}

impl CompletionConfig {
    /// Add an extra request-body field (builder pattern).
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Trait that all completion backends implement.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a completion.
    ///
    /// # Arguments
    /// * `model`    — Model identifier (e.g. `"ollama/mistral"`, `"gpt-4o-mini"`).
    /// * `messages` — Full ordered message list, system message first.
    /// * `config`   — Temperature, max_tokens, extra kwargs.
    ///
    /// # Returns
    /// The generated text. Transport failures (network, non-2xx, undecodable
    /// body) are returned as `Err`.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        config: &CompletionConfig,
    ) -> anyhow::Result<String>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
