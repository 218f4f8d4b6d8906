// Configuration module for the chat relay

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::proxy::router::provider_config;
use crate::proxy::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Keyed by provider key (`groq`, `gemini`, `zai`)
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            providers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() { "0.0.0.0" } else { &self.host };
        format!("{}:{}", host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat-relay")
        .join("config.yaml")
}

/// Expand a leading `~` to the home directory
pub fn resolve_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    PathBuf::from(path)
}

/// Read the config file, writing defaults first if it does not exist yet
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        return Ok(config);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let default_config = AppConfig::default();
    let content = serde_yaml::to_string(&default_config)?;
    std::fs::write(path, content)?;
    tracing::info!("Wrote default config to {:?}", path);
    Ok(default_config)
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(your[_\- ]?(api[_\- ]?)?key([_\- ]?here)?|<.*>|x{3,}|changeme|placeholder|todo)$")
        .unwrap_or_else(|e| unreachable!("placeholder pattern is valid: {}", e))
});

/// True for values that are clearly not a real credential
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || PLACEHOLDER.is_match(value)
}

/// Provider credentials, read once at startup
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<Provider, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut credentials = Self::new();
        for provider in Provider::ALL {
            let env = provider_config(provider).credential_env;
            match std::env::var(env) {
                Ok(value) if !is_placeholder(&value) => {
                    credentials.keys.insert(provider, value.trim().to_string());
                }
                Ok(_) => tracing::warn!("{} is set to a placeholder value, {} disabled", env, provider),
                Err(_) => tracing::info!("{} not set, {} disabled", env, provider),
            }
        }
        credentials
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    /// The usable credential for a provider, if any
    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys
            .get(&provider)
            .map(|k| k.as_str())
            .filter(|k| !is_placeholder(k))
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        for value in [
            "",
            "   ",
            "your_api_key_here",
            "YOUR_API_KEY",
            "your-api-key",
            "your key here",
            "<gemini key>",
            "xxxxxxxx",
            "changeme",
        ] {
            assert!(is_placeholder(value), "{:?} should be a placeholder", value);
        }

        for value in ["gsk_4f9a8b", "AIzaSyD-123", "sk-proj-abc"] {
            assert!(!is_placeholder(value), "{:?} should be accepted", value);
        }
    }

    #[test]
    fn test_credentials_filter_placeholders() {
        let credentials = Credentials::new()
            .with_key(Provider::Groq, "gsk_real")
            .with_key(Provider::Gemini, "your_api_key_here");

        assert_eq!(credentials.get(Provider::Groq), Some("gsk_real"));
        assert_eq!(credentials.get(Provider::Gemini), None);
        assert!(!credentials.is_configured(Provider::Zai));
    }

    #[test]
    fn test_load_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.port, 8787);
        assert_eq!(config.upstream_timeout_secs, 60);

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.bind_addr(), "0.0.0.0:8787");
    }

    #[test]
    fn test_load_config_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
host: 127.0.0.1
port: 9000
upstream-timeout-secs: 5
providers:
  gemini:
    model: gemini-2.5-flash
    max-tokens: 2048
  zai:
    base-url: http://localhost:11434/v1
    system-prompt: You are a helpful AI assistant.
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(config.providers["gemini"].model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.providers["gemini"].max_tokens, Some(2048));
        assert_eq!(
            config.providers["zai"].system_prompt.as_deref(),
            Some("You are a helpful AI assistant.")
        );
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/etc/relay.yaml"), PathBuf::from("/etc/relay.yaml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_path("~/relay.yaml"), home.join("relay.yaml"));
        }
    }
}
