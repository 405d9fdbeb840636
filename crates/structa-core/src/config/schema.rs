//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentDefaults`, `ProvidersConfig`, `LogConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.structa/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentDefaults,
    pub providers: ProvidersConfig,
    pub log: LogConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Default agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Model identifier, optionally prefixed with a provider (`"ollama/mistral"`).
    pub model: String,
    /// Maximum request cycles per user turn.
    pub max_iterations: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate per completion.
    pub max_tokens: u32,
    /// Persona text for the main system message. Built-in default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Persona text for the JSON fixer system message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixer_system_prompt: Option<String>,
    /// Log the compiled system prompt when an agent starts a turn.
    pub show_system_prompt: bool,
    /// Log prior history when an agent starts a turn.
    pub show_history: bool,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: "ollama/mistral".to_string(),
            max_iterations: 10,
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
            fixer_system_prompt: None,
            show_system_prompt: false,
            show_history: false,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Connection settings for a single completion provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for bearer authentication. Empty for local providers.
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub ollama: ProviderConfig,
    pub openai: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub groq: ProviderConfig,
}

impl ProvidersConfig {
    /// Name → config map, keyed by the provider registry names.
    pub fn to_map(&self) -> HashMap<String, ProviderConfig> {
        let mut map = HashMap::new();
        map.insert("ollama".to_string(), self.ollama.clone());
        map.insert("openai".to_string(), self.openai.clone());
        map.insert("openrouter".to_string(), self.openrouter.clone());
        map.insert("deepseek".to_string(), self.deepseek.clone());
        map.insert("groq".to_string(), self.groq.clone());
        map
    }
}

// ─────────────────────────────────────────────
// Log
// ─────────────────────────────────────────────

/// Conversation log settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// Directory receiving dated conversation logs. Disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_log_dir: Option<String>,
}
