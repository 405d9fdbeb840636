//! Generic HTTP provider for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Covers Ollama (local), OpenAI, DeepSeek, Groq and OpenRouter. Only the
//! text of the first choice is read; native tool calling is never requested.

use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use structa_core::types::Message;

use crate::registry::{resolve_model_name, ProviderConfig, ProviderSpec};
use crate::traits::{CompletionConfig, CompletionProvider};

/// Response body subset we care about.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A completion provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    client: reqwest::Client,
    api_base: String,
    /// Empty for keyless local providers; no `Authorization` header is sent then.
    api_key: String,
    extra_headers: HeaderMap,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("provider", &self.spec.display_name)
            .field("authenticated", &!self.api_key.is_empty())
            .finish()
    }
}

impl HttpProvider {
    /// Create a provider from a user config and its registry spec.
    ///
    /// The API base comes from the config when set, else from the provider default.
    pub fn new(config: &ProviderConfig, spec: &'static ProviderSpec) -> anyhow::Result<Self> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| spec.default_api_base.to_string());

        let mut extra_headers = HeaderMap::new();
        for (key, value) in config.extra_headers.iter().flatten() {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(val)) => {
                    extra_headers.insert(name, val);
                }
                _ => warn!("Invalid header: {}={}", key, value),
            }
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;

        Ok(HttpProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            extra_headers,
            spec,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Assemble the JSON request body. Extra kwargs are merged last and may
    /// override the defaults.
    fn request_body(&self, model: &str, messages: &[Message], config: &CompletionConfig) -> Value {
        let mut body = Map::new();
        body.insert(
            "model".to_string(),
            Value::String(resolve_model_name(model, self.spec)),
        );
        body.insert("messages".to_string(), serde_json::json!(messages));
        body.insert("max_tokens".to_string(), config.max_tokens.into());
        body.insert("temperature".to_string(), config.temperature.into());
        for (key, value) in &config.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

#[async_trait]
impl CompletionProvider for HttpProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        config: &CompletionConfig,
    ) -> anyhow::Result<String> {
        let body = self.request_body(model, messages, config);

        debug!(
            provider = self.spec.display_name,
            model = %body["model"],
            messages = messages.len(),
            "Calling LLM"
        );

        let mut request = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
            anyhow::anyhow!("Error calling {}: {}", self.spec.display_name, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            bail!("Error calling {}: {} {}", self.spec.display_name, status, error_text);
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .with_context(|| format!("Error parsing {} response", self.spec.display_name))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .context("completion response has no choices")?
            .message
            .content
            .unwrap_or_default();

        debug!(
            provider = self.spec.display_name,
            chars = content.len(),
            "LLM response received"
        );
        Ok(content)
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build an [`HttpProvider`] from a model name and the configured providers.
pub fn create_provider(
    model: &str,
    providers: &HashMap<String, ProviderConfig>,
) -> anyhow::Result<HttpProvider> {
    let (config, spec) = crate::registry::match_provider(model, providers).with_context(|| {
        format!(
            "No configured provider found for model '{}'. \
             Use an `ollama/` model or set an API key (e.g. STRUCTA_PROVIDERS__OPENAI__API_KEY).",
            model
        )
    })?;

    debug!(
        provider = spec.display_name,
        model = model,
        api_base = config.api_base.as_deref().unwrap_or(spec.default_api_base),
        "Creating LLM provider"
    );

    HttpProvider::new(&config, spec)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
