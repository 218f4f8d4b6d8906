// Request/Response translation between the uniform turn list and provider wire formats

use serde_json::Value;

use super::router::{AuthStyle, ProviderEntry, SystemTurns};
use super::upstream::OutboundRequest;
use super::{ChatTurn, Role};

/// Turns as a provider body builder sees them.
///
/// For hoisting providers `system` holds the system instructions in order and
/// `turns` has none left; for inline providers `system` is empty.
#[derive(Debug)]
pub struct Conversation<'a> {
    pub system: Vec<&'a str>,
    pub turns: Vec<(Role, &'a str)>,
}

/// What a provider reply boiled down to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    /// The provider declined for policy reasons
    Blocked(String),
}

fn split_conversation<'a>(entry: &'a ProviderEntry, turns: &'a [ChatTurn]) -> Conversation<'a> {
    let has_system_turn = turns.iter().any(ChatTurn::is_system);
    let default_prompt = entry
        .settings
        .system_prompt
        .as_deref()
        .filter(|_| !has_system_turn);

    match entry.config.system_turns {
        SystemTurns::Inline => {
            let mut inline = Vec::with_capacity(turns.len() + 1);
            if let Some(prompt) = default_prompt {
                inline.push((Role::System, prompt));
            }
            inline.extend(turns.iter().map(|t| (t.role(), t.content())));
            Conversation {
                system: Vec::new(),
                turns: inline,
            }
        }
        SystemTurns::Hoisted => {
            let mut system: Vec<&str> = turns
                .iter()
                .filter(|t| t.is_system())
                .map(ChatTurn::content)
                .collect();
            if let Some(prompt) = default_prompt {
                system.push(prompt);
            }
            Conversation {
                system,
                turns: turns
                    .iter()
                    .filter(|t| !t.is_system())
                    .map(|t| (t.role(), t.content()))
                    .collect(),
            }
        }
    }
}

/// Build the provider call for a conversation. Pure: same input, same output.
pub fn build_request(entry: &ProviderEntry, credential: &str, turns: &[ChatTurn]) -> OutboundRequest {
    let config = entry.config;
    let conversation = split_conversation(entry, turns);
    let body = (config.build_body)(&entry.settings, &conversation);
    let endpoint = (config.endpoint)(&entry.settings);

    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];

    let (url, url_secret) = match config.auth {
        AuthStyle::Bearer => {
            headers.push(("Authorization".to_string(), format!("Bearer {}", credential)));
            (endpoint, None)
        }
        AuthStyle::QueryKey => {
            let encoded = urlencoding::encode(credential).into_owned();
            let separator = if endpoint.contains('?') { '&' } else { '?' };
            (format!("{}{}key={}", endpoint, separator, encoded), Some(encoded))
        }
    };

    OutboundRequest {
        url,
        headers,
        body,
        url_secret,
    }
}

/// Pull the reply text out of a provider response; `None` means the shape was not recognized.
pub fn extract_text(entry: &ProviderEntry, body: &Value) -> Option<Extracted> {
    (entry.config.extract_text)(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::router::ProviderRegistry;
    use crate::proxy::Provider;

    fn turn(role: Role, content: &str) -> ChatTurn {
        ChatTurn::new(role, content).unwrap()
    }

    fn sample_turns() -> Vec<ChatTurn> {
        vec![
            turn(Role::System, "be brief"),
            turn(Role::User, "hello"),
            turn(Role::Assistant, "hi"),
            turn(Role::User, "how are you?"),
        ]
    }

    #[test]
    fn test_turn_count_matches_minus_hoisted_system_turns() {
        let registry = ProviderRegistry::default();
        let turns = sample_turns();

        let groq = build_request(registry.get(Provider::Groq), "k", &turns);
        assert_eq!(groq.body["messages"].as_array().unwrap().len(), 4);

        let zai = build_request(registry.get(Provider::Zai), "k", &turns);
        assert_eq!(zai.body["messages"].as_array().unwrap().len(), 4);

        let gemini = build_request(registry.get(Provider::Gemini), "k", &turns);
        assert_eq!(gemini.body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(gemini.body["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn test_build_request_is_deterministic() {
        let registry = ProviderRegistry::default();
        let turns = sample_turns();

        for provider in Provider::ALL {
            let entry = registry.get(provider);
            let first = build_request(entry, "key-123", &turns);
            let second = build_request(entry, "key-123", &turns);
            assert_eq!(first, second);
            assert_eq!(
                serde_json::to_vec(&first.body).unwrap(),
                serde_json::to_vec(&second.body).unwrap()
            );
        }
    }

    #[test]
    fn test_bearer_and_query_credentials() {
        let registry = ProviderRegistry::default();
        let turns = vec![turn(Role::User, "hello")];

        let groq = build_request(registry.get(Provider::Groq), "gsk_abc", &turns);
        assert_eq!(groq.url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(groq.header("authorization"), Some("Bearer gsk_abc"));
        assert_eq!(groq.redacted_url(), groq.url);

        let gemini = build_request(registry.get(Provider::Gemini), "a b/c", &turns);
        assert_eq!(
            gemini.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent?key=a%20b%2Fc"
        );
        assert_eq!(gemini.header("authorization"), None);
        assert!(!gemini.redacted_url().contains("a%20b%2Fc"));
    }

    #[test]
    fn test_configured_system_prompt_only_when_absent() {
        let mut registry_config = crate::config::AppConfig::default();
        for key in ["groq", "gemini"] {
            registry_config.providers.insert(
                key.to_string(),
                crate::config::ProviderOverride {
                    system_prompt: Some("You are helpful.".to_string()),
                    ..Default::default()
                },
            );
        }
        let registry = ProviderRegistry::from_config(&registry_config);

        let plain = vec![turn(Role::User, "hello")];
        let groq = build_request(registry.get(Provider::Groq), "k", &plain);
        assert_eq!(groq.body["messages"][0]["role"], "system");
        assert_eq!(groq.body["messages"][0]["content"], "You are helpful.");
        assert_eq!(groq.body["messages"].as_array().unwrap().len(), 2);

        let gemini = build_request(registry.get(Provider::Gemini), "k", &plain);
        assert_eq!(gemini.body["systemInstruction"]["parts"][0]["text"], "You are helpful.");

        let with_system = sample_turns();
        let groq = build_request(registry.get(Provider::Groq), "k", &with_system);
        assert_eq!(groq.body["messages"][0]["content"], "be brief");
        assert_eq!(groq.body["messages"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_zai_prepends_default_prompt() {
        let registry = ProviderRegistry::default();

        let plain = vec![turn(Role::User, "hello")];
        let zai = build_request(registry.get(Provider::Zai), "k", &plain);
        assert_eq!(
            zai.body["messages"],
            serde_json::json!([
                {
                    "role": "system",
                    "content": "You are a helpful AI assistant. Provide clear, concise, and accurate responses."
                },
                { "role": "user", "content": "hello" }
            ])
        );

        let groq = build_request(registry.get(Provider::Groq), "k", &plain);
        assert_eq!(groq.body["messages"].as_array().unwrap().len(), 1);
    }
}
