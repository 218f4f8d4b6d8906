// OpenAI-compatible chat completions wire format (Groq, OpenAI)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proxy::router::ProviderSettings;
use crate::proxy::translator::{Conversation, Extracted};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub fn chat_completions_url(settings: &ProviderSettings) -> String {
    format!("{}/chat/completions", settings.base_url.trim_end_matches('/'))
}

pub fn build_chat_body(settings: &ProviderSettings, conversation: &Conversation<'_>) -> Value {
    let messages = conversation
        .system
        .iter()
        .map(|text| ChatMessage {
            role: "system".to_string(),
            content: text.to_string(),
        })
        .chain(conversation.turns.iter().map(|(role, text)| ChatMessage {
            role: role.as_str().to_string(),
            content: text.to_string(),
        }))
        .collect();

    let request = ChatCompletionRequest {
        model: settings.model.clone(),
        messages,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    };

    serde_json::to_value(request).unwrap_or(Value::Null)
}

pub fn extract_text(body: &Value) -> Option<Extracted> {
    let choice = body.get("choices").and_then(|c| c.get(0))?;
    let message = choice.get("message");

    if let Some(refusal) = message
        .and_then(|m| m.get("refusal"))
        .and_then(|r| r.as_str())
        .filter(|r| !r.is_empty())
    {
        return Some(Extracted::Blocked(refusal.to_string()));
    }

    if let Some(content) = message.and_then(|m| m.get("content")).and_then(|c| c.as_str()) {
        return Some(Extracted::Text(content.to_string()));
    }

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("content_filter") => Some(Extracted::Blocked("content_filter".to_string())),
        _ => None,
    }
}
