// Provider registry - the static table of supported providers and their resolved settings

use serde_json::Value;

use super::translator::{Conversation, Extracted};
use super::Provider;
use crate::api::{gemini, openai};
use crate::config::{AppConfig, ProviderOverride};

/// How the credential travels to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `?key=<key>` appended to the endpoint
    QueryKey,
}

/// Where system turns go in the outbound body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTurns {
    /// Kept in the message list with their own role
    Inline,
    /// Pulled out into a dedicated system-instruction slot
    Hoisted,
}

/// Static description of one provider. Adding a provider means adding one entry to `PROVIDERS`.
pub struct ProviderConfig {
    pub provider: Provider,
    pub credential_env: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Used when a conversation carries no system turn of its own
    pub system_prompt: Option<&'static str>,
    pub auth: AuthStyle,
    pub system_turns: SystemTurns,
    pub endpoint: fn(&ProviderSettings) -> String,
    pub build_body: fn(&ProviderSettings, &Conversation<'_>) -> Value,
    pub extract_text: fn(&Value) -> Option<Extracted>,
}

static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        provider: Provider::Groq,
        credential_env: "GROQ_API_KEY",
        base_url: "https://api.groq.com/openai/v1",
        model: "llama-3.3-70b-versatile",
        temperature: 0.7,
        max_tokens: 1024,
        system_prompt: None,
        auth: AuthStyle::Bearer,
        system_turns: SystemTurns::Inline,
        endpoint: openai::chat_completions_url,
        build_body: openai::build_chat_body,
        extract_text: openai::extract_text,
    },
    ProviderConfig {
        provider: Provider::Gemini,
        credential_env: "GEMINI_API_KEY",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        model: "gemini-1.5-flash-latest",
        temperature: 0.7,
        max_tokens: 1024,
        system_prompt: None,
        auth: AuthStyle::QueryKey,
        system_turns: SystemTurns::Hoisted,
        endpoint: gemini::generate_content_url,
        build_body: gemini::build_generate_body,
        extract_text: gemini::extract_text,
    },
    // Served through its OpenAI-compatible API
    ProviderConfig {
        provider: Provider::Zai,
        credential_env: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        model: "gpt-3.5-turbo",
        temperature: 0.7,
        max_tokens: 1024,
        system_prompt: Some(
            "You are a helpful AI assistant. Provide clear, concise, and accurate responses.",
        ),
        auth: AuthStyle::Bearer,
        system_turns: SystemTurns::Inline,
        endpoint: openai::chat_completions_url,
        build_body: openai::build_chat_body,
        extract_text: openai::extract_text,
    },
];

/// Keys older clients still send. Format: (alias, provider)
static PROVIDER_ALIASES: &[(&str, Provider)] = &[
    ("grok", Provider::Groq),
    ("openai", Provider::Zai),
];

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Resolve a provider key or one of its aliases
pub fn resolve_provider_key(key: &str) -> Option<Provider> {
    let key = normalize_key(key);

    if let Some(provider) = Provider::ALL.iter().find(|p| p.key() == key) {
        return Some(*provider);
    }

    PROVIDER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, provider)| *provider)
}

pub fn provider_config(provider: Provider) -> &'static ProviderConfig {
    PROVIDERS
        .iter()
        .find(|c| c.provider == provider)
        .unwrap_or_else(|| unreachable!("every Provider variant has a table entry"))
}

/// Per-provider values after applying config file overrides to the static defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl ProviderSettings {
    fn resolve(config: &ProviderConfig, overrides: Option<&ProviderOverride>) -> Self {
        let mut settings = Self {
            base_url: config.base_url.to_string(),
            model: config.model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.map(str::to_string),
        };

        if let Some(o) = overrides {
            if let Some(base_url) = o.base_url.as_deref().filter(|v| !v.trim().is_empty()) {
                settings.base_url = base_url.trim_end_matches('/').to_string();
            }
            if let Some(model) = o.model.as_deref().filter(|v| !v.trim().is_empty()) {
                settings.model = model.to_string();
            }
            if let Some(temperature) = o.temperature {
                settings.temperature = temperature;
            }
            if let Some(max_tokens) = o.max_tokens {
                settings.max_tokens = max_tokens;
            }
            // A blank prompt switches the default off
            if let Some(prompt) = o.system_prompt.as_deref() {
                settings.system_prompt = Some(prompt.to_string()).filter(|v| !v.trim().is_empty());
            }
        }

        settings
    }
}

pub struct ProviderEntry {
    pub config: &'static ProviderConfig,
    pub settings: ProviderSettings,
}

/// Read-only after construction; shared by every request.
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let entries = PROVIDERS
            .iter()
            .map(|c| ProviderEntry {
                config: c,
                settings: ProviderSettings::resolve(c, config.providers.get(c.provider.key())),
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, provider: Provider) -> &ProviderEntry {
        self.entries
            .iter()
            .find(|e| e.config.provider == provider)
            .unwrap_or_else(|| unreachable!("registry is built from the full provider table"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_provider_key() {
        assert_eq!(resolve_provider_key("groq"), Some(Provider::Groq));
        assert_eq!(resolve_provider_key(" Gemini "), Some(Provider::Gemini));
        assert_eq!(resolve_provider_key("zai"), Some(Provider::Zai));
        assert_eq!(resolve_provider_key("grok"), Some(Provider::Groq));
        assert_eq!(resolve_provider_key("openai"), Some(Provider::Zai));
        assert_eq!(resolve_provider_key("unknown"), None);
        assert_eq!(resolve_provider_key(""), None);
    }

    #[test]
    fn test_every_provider_has_an_entry() {
        let registry = ProviderRegistry::default();
        for provider in Provider::ALL {
            assert_eq!(registry.get(provider).config.provider, provider);
        }
        assert_eq!(registry.iter().count(), Provider::ALL.len());
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "groq".to_string(),
            ProviderOverride {
                base_url: Some("http://localhost:9000/v1/".to_string()),
                model: Some("llama3-8b-8192".to_string()),
                temperature: None,
                max_tokens: Some(256),
                system_prompt: Some("  ".to_string()),
            },
        );

        let registry = ProviderRegistry::from_config(&config);
        let groq = &registry.get(Provider::Groq).settings;
        assert_eq!(groq.base_url, "http://localhost:9000/v1");
        assert_eq!(groq.model, "llama3-8b-8192");
        assert_eq!(groq.temperature, 0.7);
        assert_eq!(groq.max_tokens, 256);
        assert_eq!(groq.system_prompt, None);

        let gemini = &registry.get(Provider::Gemini).settings;
        assert_eq!(gemini.model, "gemini-1.5-flash-latest");
    }

    #[test]
    fn test_zai_default_system_prompt() {
        let registry = ProviderRegistry::default();
        assert_eq!(
            registry.get(Provider::Zai).settings.system_prompt.as_deref(),
            Some("You are a helpful AI assistant. Provide clear, concise, and accurate responses.")
        );
        assert_eq!(registry.get(Provider::Groq).settings.system_prompt, None);
        assert_eq!(registry.get(Provider::Gemini).settings.system_prompt, None);

        let mut config = AppConfig::default();
        config.providers.insert(
            "zai".to_string(),
            ProviderOverride {
                system_prompt: Some(String::new()),
                ..Default::default()
            },
        );
        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.get(Provider::Zai).settings.system_prompt, None);

        config.providers.insert(
            "zai".to_string(),
            ProviderOverride {
                model: Some("gpt-4o-mini".to_string()),
                ..Default::default()
            },
        );
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.get(Provider::Zai).settings.system_prompt.is_some());
    }
}
