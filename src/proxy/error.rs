// Error taxonomy for the relay and its HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use super::Provider;

/// Problems with the inbound request itself. Always caller-caused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body is not a JSON object: {0}")]
    InvalidJson(String),

    #[error("Missing 'providerKey' field")]
    MissingProvider,

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Missing 'turns' field")]
    MissingTurns,

    #[error("'turns' must be an array")]
    TurnsNotArray,

    #[error("'turns' must not be empty")]
    EmptyTurns,

    #[error("Turn {0} has no text content")]
    EmptyTurn(usize),

    #[error("{0} needs at least one user or assistant turn")]
    OnlySystemTurns(Provider),
}

/// Coarse classification used in logs and by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Upstream,
    Timeout,
    Parse,
    Internal,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("API key not configured for {provider}")]
    MissingCredential {
        provider: Provider,
        env: &'static str,
    },

    #[error("Upstream API error")]
    Upstream { status: u16, body: String },

    #[error("Upstream API timeout")]
    Timeout(Duration),

    #[error("Failed to parse response from {provider}")]
    MalformedResponse { provider: Provider, payload: String },

    #[error("Internal Server Error")]
    Internal(String),
}

impl ProxyError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingCredential { .. } => ErrorKind::Configuration,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::MalformedResponse { .. } => ErrorKind::Parse,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Status reported by the provider, when the failure came from one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::MethodNotAllowed) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredential { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // Passed through as-is so callers can tell auth failures from rate limits
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::MalformedResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Validation(ValidationError::MethodNotAllowed) => None,
            Self::Validation(e) => Some(e.to_string()),
            Self::MissingCredential { env, .. } => Some(format!("Set the {} environment variable", env)),
            Self::Upstream { body, .. } => Some(body.clone()),
            Self::Timeout(after) => Some(format!(
                "No response from upstream within {}s",
                after.as_secs_f64()
            )),
            Self::MalformedResponse { .. } => None,
            Self::Internal(msg) => Some(msg.clone()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let error = match &self {
            Self::Validation(ValidationError::MethodNotAllowed) => self.to_string(),
            Self::Validation(_) => "Invalid request".to_string(),
            other => other.to_string(),
        };

        let body = match self.details() {
            Some(details) => json!({ "error": error, "details": details }),
            None => json!({ "error": error }),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
