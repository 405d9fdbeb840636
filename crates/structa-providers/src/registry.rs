//! Provider registry — static specs for the supported completion backends.
//!
//! Model identifiers may carry a routing prefix naming the provider
//! (`"ollama/mistral"`, `"groq/llama-3.3-70b-versatile"`). Without one, the
//! model name is matched by keyword, then against configured gateways.

use std::collections::HashMap;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// Static description of one completion provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name, also the routing prefix (e.g. `"ollama"`).
    pub name: &'static str,
    /// Keywords to match in model names (lowercase). E.g. `&["gpt", "o1"]`.
    pub keywords: &'static [&'static str],
    /// Human-readable name for logs. E.g. `"Ollama"`.
    pub display_name: &'static str,
    /// Whether this is a gateway/aggregator used as fallback.
    pub is_gateway: bool,
    /// Whether this is a local provider that needs no API key.
    pub is_local: bool,
    /// Default OpenAI-compatible API base URL.
    pub default_api_base: &'static str,
}

/// Supported providers, in matching priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "openrouter",
        keywords: &["openrouter"],
        display_name: "OpenRouter",
        is_gateway: true,
        is_local: false,
        default_api_base: "https://openrouter.ai/api/v1",
    },
    ProviderSpec {
        name: "openai",
        keywords: &["gpt", "o1", "o3", "o4"],
        display_name: "OpenAI",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.openai.com/v1",
    },
    ProviderSpec {
        name: "deepseek",
        keywords: &["deepseek"],
        display_name: "DeepSeek",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.deepseek.com/v1",
    },
    ProviderSpec {
        name: "groq",
        keywords: &["groq"],
        display_name: "Groq",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.groq.com/openai/v1",
    },
    ProviderSpec {
        name: "ollama",
        keywords: &["ollama", "mistral", "llama", "qwen", "phi", "gemma"],
        display_name: "Ollama",
        is_gateway: false,
        is_local: true,
        default_api_base: "http://localhost:11434/v1",
    },
];

// ─────────────────────────────────────────────
// Matching functions
// ─────────────────────────────────────────────

/// Find a provider spec by exact name.
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.name == name)
}

/// Find a provider by the routing prefix of a model (`"ollama/mistral"` → Ollama).
pub fn find_by_prefix(model: &str) -> Option<&'static ProviderSpec> {
    let (prefix, _) = model.split_once('/')?;
    find_by_name(&prefix.to_lowercase())
}

/// Find a provider spec by matching keywords against a model name.
///
/// Skips gateways — those are fallback only.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS.iter().find(|spec| {
        !spec.is_gateway && spec.keywords.iter().any(|kw| model_lower.contains(kw))
    })
}

/// Strip the provider's own routing prefix from a model name.
///
/// `"ollama/mistral"` → `"mistral"`; `"openrouter/anthropic/claude-3"` →
/// `"anthropic/claude-3"`; unprefixed names pass through.
pub fn resolve_model_name(model: &str, spec: &ProviderSpec) -> String {
    match model.split_once('/') {
        Some((prefix, rest)) if prefix.eq_ignore_ascii_case(spec.name) => rest.to_string(),
        _ => model.to_string(),
    }
}

/// Re-export the provider config from core — single source of truth.
pub use structa_core::config::schema::ProviderConfig;

/// Match a model name to a usable provider.
///
/// 1. Routing prefix, then keyword match — usable if local or keyed.
/// 2. Fallback to the first configured gateway.
///
/// Local providers missing from `providers` get a default (keyless) config.
pub fn match_provider(
    model: &str,
    providers: &HashMap<String, ProviderConfig>,
) -> Option<(ProviderConfig, &'static ProviderSpec)> {
    let direct = find_by_prefix(model).or_else(|| find_by_model(model));
    if let Some(spec) = direct {
        let config = providers.get(spec.name).cloned().unwrap_or_default();
        if spec.is_local || config.is_configured() {
            return Some((config, spec));
        }
    }

    PROVIDERS
        .iter()
        .filter(|s| s.is_gateway)
        .find_map(|spec| {
            providers
                .get(spec.name)
                .filter(|c| c.is_configured())
                .map(|c| (c.clone(), spec))
        })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_by_prefix() {
        assert_eq!(find_by_prefix("ollama/mistral").unwrap().name, "ollama");
        assert_eq!(find_by_prefix("groq/llama-3.3-70b").unwrap().name, "groq");
        assert!(find_by_prefix("mistral").is_none());
        assert!(find_by_prefix("unknown/model").is_none());
    }

    #[test]
    fn test_find_by_model_keywords() {
        assert_eq!(find_by_model("gpt-4o-mini").unwrap().name, "openai");
        assert_eq!(find_by_model("deepseek-chat").unwrap().name, "deepseek");
        assert_eq!(find_by_model("mistral:7b").unwrap().name, "ollama");
        assert!(find_by_model("claude-3-opus").is_none());
    }

    #[test]
    fn test_resolve_model_name() {
        let ollama = find_by_name("ollama").unwrap();
        let openrouter = find_by_name("openrouter").unwrap();
        assert_eq!(resolve_model_name("ollama/mistral", ollama), "mistral");
        assert_eq!(resolve_model_name("mistral", ollama), "mistral");
        assert_eq!(
            resolve_model_name("openrouter/anthropic/claude-3", openrouter),
            "anthropic/claude-3"
        );
        assert_eq!(
            resolve_model_name("anthropic/claude-3", openrouter),
            "anthropic/claude-3"
        );
    }

    #[test]
    fn test_match_local_without_key() {
        let providers = HashMap::new();
        let (config, spec) = match_provider("ollama/mistral", &providers).unwrap();
        assert_eq!(spec.name, "ollama");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_match_requires_key_for_remote() {
        let mut providers = HashMap::new();
        assert!(match_provider("gpt-4o", &providers).is_none());

        providers.insert("openai".to_string(), keyed("sk-test"));
        let (config, spec) = match_provider("gpt-4o", &providers).unwrap();
        assert_eq!(spec.name, "openai");
        assert_eq!(config.api_key, "sk-test");
    }

    #[test]
    fn test_match_falls_back_to_gateway() {
        let mut providers = HashMap::new();
        providers.insert("openrouter".to_string(), keyed("sk-or-123"));
        let (_, spec) = match_provider("anthropic/claude-3-opus", &providers).unwrap();
        assert_eq!(spec.name, "openrouter");
    }

    #[test]
    fn test_gateways_are_fallback_only() {
        assert!(PROVIDERS.iter().filter(|s| s.is_gateway).all(|s| s.name == "openrouter"));
        assert!(find_by_name("ollama").unwrap().is_local);
    }
}
