// Proxy module - validates chat requests, routes them to a provider and normalizes the reply

pub mod error;
pub mod router;
pub mod translator;
pub mod upstream;
pub mod validator;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Credentials;
pub use error::{ErrorKind, ProxyError, ValidationError};
use router::{ProviderRegistry, SystemTurns};
use translator::Extracted;
use upstream::Upstream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    Gemini,
    Zai,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Groq, Provider::Gemini, Provider::Zai];

    pub fn key(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::Gemini => "gemini",
            Provider::Zai => "zai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One message of a conversation. Content is never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    role: Role,
    content: String,
}

impl ChatTurn {
    /// Returns `None` when the content is blank after trimming.
    pub fn new(role: Role, content: impl Into<String>) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self { role, content })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub provider: Provider,
    pub turns: Vec<ChatTurn>,
}

/// The only success shape the relay hands back, whichever provider answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedReply {
    #[serde(rename = "response")]
    pub text: String,
}

impl NormalizedReply {
    pub fn blocked(reason: &str) -> Self {
        Self {
            text: format!("[SYSTEM: blocked — {}]", reason),
        }
    }
}

/// Wires validation, provider selection, the outbound call and reply normalization.
pub struct Orchestrator {
    registry: ProviderRegistry,
    credentials: Credentials,
    upstream: Arc<dyn Upstream>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: ProviderRegistry,
        credentials: Credentials,
        upstream: Arc<dyn Upstream>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            credentials,
            upstream,
            timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn handle(&self, method: &Method, body: &[u8]) -> Result<NormalizedReply, ProxyError> {
        let request = validator::validate(method, body)?;
        self.route_request(request).await
    }

    pub async fn route_request(&self, request: ProviderRequest) -> Result<NormalizedReply, ProxyError> {
        let provider = request.provider;
        let entry = self.registry.get(provider);

        // Hoisting would leave the provider an empty conversation
        let hoisted = entry.config.system_turns == SystemTurns::Hoisted;
        if hoisted && request.turns.iter().all(ChatTurn::is_system) {
            return Err(ValidationError::OnlySystemTurns(provider).into());
        }

        let credential = self.credentials.get(provider).ok_or_else(|| {
            tracing::error!("No credential configured for {} ({})", provider, entry.config.credential_env);
            ProxyError::MissingCredential {
                provider,
                env: entry.config.credential_env,
            }
        })?;

        let outbound = translator::build_request(entry, credential, &request.turns);
        tracing::info!(
            "Forwarding {} turns to {} (model={})",
            request.turns.len(),
            provider,
            entry.settings.model
        );
        tracing::debug!("Outbound URL: {}", outbound.redacted_url());

        let response = match tokio::time::timeout(self.timeout, self.upstream.send(&outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("{} request failed: {}", provider, e);
                return Err(ProxyError::internal(e.to_string()));
            }
            Err(_) => {
                tracing::warn!("{} did not answer within {:?}", provider, self.timeout);
                return Err(ProxyError::Timeout(self.timeout));
            }
        };

        if !response.is_success() {
            tracing::warn!("{} API error ({}): {}", provider, response.status, response.body);
            return Err(ProxyError::Upstream {
                status: response.status,
                body: response.body,
            });
        }

        let malformed = |payload: &str| {
            tracing::error!("Unexpected response shape from {}: {}", provider, payload);
            ProxyError::MalformedResponse {
                provider,
                payload: payload.to_string(),
            }
        };

        let body: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|_| malformed(&response.body))?;

        match translator::extract_text(entry, &body) {
            Some(Extracted::Text(text)) => Ok(NormalizedReply { text }),
            Some(Extracted::Blocked(reason)) => {
                tracing::info!("{} blocked the generation: {}", provider, reason);
                Ok(NormalizedReply::blocked(&reason))
            }
            None => Err(malformed(&response.body)),
        }
    }
}
