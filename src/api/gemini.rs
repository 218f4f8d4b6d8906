// Gemini generateContent wire format
// API key travels as a query parameter; system turns go to systemInstruction

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proxy::router::ProviderSettings;
use crate::proxy::translator::{Conversation, Extracted};
use crate::proxy::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Safety setting for Gemini API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Finish reasons that mean the candidate was withheld, not that it ran out of data
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

fn default_safety_settings() -> Vec<SafetySetting> {
    SAFETY_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: SAFETY_THRESHOLD.to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

pub fn generate_content_url(settings: &ProviderSettings) -> String {
    format!(
        "{}/models/{}:generateContent",
        settings.base_url.trim_end_matches('/'),
        settings.model
    )
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        // System turns are hoisted before we get here
        Role::User | Role::System => "user",
    }
}

pub fn build_generate_body(settings: &ProviderSettings, conversation: &Conversation<'_>) -> Value {
    let contents = conversation
        .turns
        .iter()
        .map(|(role, text)| GeminiContent {
            role: Some(gemini_role(*role).to_string()),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        })
        .collect();

    let system_instruction = if conversation.system.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: conversation
                .system
                .iter()
                .map(|text| GeminiPart {
                    text: text.to_string(),
                })
                .collect(),
        })
    };

    let request = GeminiGenerateRequest {
        contents,
        system_instruction,
        generation_config: GeminiGenerationConfig {
            temperature: settings.temperature,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: settings.max_tokens,
        },
        safety_settings: default_safety_settings(),
    };

    serde_json::to_value(request).unwrap_or(Value::Null)
}

pub fn extract_text(body: &Value) -> Option<Extracted> {
    if let Some(reason) = body
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Some(Extracted::Blocked(reason.to_string()));
    }

    let candidate = body.get("candidates").and_then(|c| c.get(0))?;

    if let Some(parts) = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let texts: Vec<&str> = parts
            .iter()
            .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if !texts.is_empty() {
            return Some(Extracted::Text(texts.join("\n")));
        }
    }

    let finish_reason = candidate.get("finishReason").and_then(|r| r.as_str());
    match finish_reason {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
            Some(Extracted::Blocked(reason.to_string()))
        }
        // Finished normally with nothing to say
        Some(_) if candidate.get("content").is_some() => Some(Extracted::Text(String::new())),
        _ => None,
    }
}
