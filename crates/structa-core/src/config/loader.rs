//! Config loader — reads `~/.structa/config.json`, merges env vars, and
//! applies legacy key migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.structa/config.json`
//! 3. Environment variables `STRUCTA_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default one) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Moves the singular `agent.maxIteration` → `agent.maxIterations`.
fn migrate_config(raw: &mut serde_json::Value) {
    if let Some(agent) = raw.get_mut("agent").and_then(|a| a.as_object_mut()) {
        if let Some(old) = agent.remove("maxIteration") {
            if !agent.contains_key("maxIterations") {
                agent.insert("maxIterations".to_string(), old);
                debug!("Migrated agent.maxIteration → agent.maxIterations");
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `STRUCTA_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `STRUCTA_AGENT__MODEL` → `agent.model`
/// - `STRUCTA_AGENT__MAX_ITERATIONS` → `agent.max_iterations`
/// - `STRUCTA_AGENT__TEMPERATURE` → `agent.temperature`
/// - `STRUCTA_AGENT__MAX_TOKENS` → `agent.max_tokens`
/// - `STRUCTA_AGENT__SYSTEM_PROMPT` → `agent.system_prompt`
/// - `STRUCTA_AGENT__SHOW_SYSTEM_PROMPT` → `agent.show_system_prompt`
/// - `STRUCTA_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `STRUCTA_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `STRUCTA_LOG__CONVERSATION_LOG_DIR` → `log.conversation_log_dir`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("STRUCTA_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Ok(val) = std::env::var("STRUCTA_AGENT__MAX_ITERATIONS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_iterations = n;
        }
    }
    if let Ok(val) = std::env::var("STRUCTA_AGENT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agent.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("STRUCTA_AGENT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("STRUCTA_AGENT__SYSTEM_PROMPT") {
        config.agent.system_prompt = Some(val);
    }
    if let Ok(val) = std::env::var("STRUCTA_AGENT__SHOW_SYSTEM_PROMPT") {
        config.agent.show_system_prompt = is_truthy(&val);
    }

    apply_provider_env(&mut config.providers.ollama, "OLLAMA");
    apply_provider_env(&mut config.providers.openai, "OPENAI");
    apply_provider_env(&mut config.providers.openrouter, "OPENROUTER");
    apply_provider_env(&mut config.providers.deepseek, "DEEPSEEK");
    apply_provider_env(&mut config.providers.groq, "GROQ");

    if let Ok(val) = std::env::var("STRUCTA_LOG__CONVERSATION_LOG_DIR") {
        config.log.conversation_log_dir = Some(val);
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("STRUCTA_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("STRUCTA_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
