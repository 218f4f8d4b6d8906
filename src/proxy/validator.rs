// Request validation - turns a raw chat request into a ProviderRequest

use axum::http::Method;
use serde_json::{Map, Value};

use super::router::resolve_provider_key;
use super::{ChatTurn, ProviderRequest, Role, ValidationError};

/// Map one raw turn onto a `ChatTurn`.
///
/// Accepts both field conventions seen from callers: `content` or `text` for the body,
/// and an explicit `role` or the older `sender: "ai"` tag.
fn normalize_turn(index: usize, raw: &Value) -> Result<ChatTurn, ValidationError> {
    let obj = raw.as_object();
    let field = |name: &str| obj.and_then(|o| o.get(name)).and_then(|v| v.as_str());

    let text = field("content")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| field("text"))
        .unwrap_or("");

    let role = match field("role").map(|r| r.trim().to_lowercase()) {
        Some(r) if r == "assistant" || r == "model" => Role::Assistant,
        Some(r) if r == "system" => Role::System,
        Some(r) if r == "user" => Role::User,
        _ => match field("sender") {
            Some("ai") => Role::Assistant,
            _ => Role::User,
        },
    };

    ChatTurn::new(role, text).ok_or(ValidationError::EmptyTurn(index))
}

/// Look a field up under its current name, then its legacy name
fn field_with_alias<'a>(obj: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    obj.get(name)
        .filter(|v| !v.is_null())
        .or_else(|| obj.get(alias).filter(|v| !v.is_null()))
}

pub fn validate(method: &Method, body: &[u8]) -> Result<ProviderRequest, ValidationError> {
    if method != Method::POST {
        return Err(ValidationError::MethodNotAllowed);
    }

    let raw: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::InvalidJson("expected an object".to_string()))?;

    let key = field_with_alias(obj, "providerKey", "ai")
        .ok_or(ValidationError::MissingProvider)?;
    let key = key
        .as_str()
        .ok_or_else(|| ValidationError::UnknownProvider(key.to_string()))?;
    let provider =
        resolve_provider_key(key).ok_or_else(|| ValidationError::UnknownProvider(key.to_string()))?;

    let turns = field_with_alias(obj, "turns", "messages")
        .ok_or(ValidationError::MissingTurns)?
        .as_array()
        .ok_or(ValidationError::TurnsNotArray)?;

    if turns.is_empty() {
        return Err(ValidationError::EmptyTurns);
    }

    let turns = turns
        .iter()
        .enumerate()
        .map(|(i, t)| normalize_turn(i, t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProviderRequest { provider, turns })
}
