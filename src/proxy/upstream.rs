// Outbound call seam between the orchestrator and the HTTP client

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A fully built provider call: where to send it, which headers, which JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    /// Credential embedded in `url`, if the provider takes it as a query parameter
    pub url_secret: Option<String>,
}

impl OutboundRequest {
    /// URL safe to write to logs.
    pub fn redacted_url(&self) -> String {
        match &self.url_secret {
            Some(secret) if !secret.is_empty() => self.url.replace(secret.as_str(), "***"),
            _ => self.url.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The call never produced an HTTP response.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    #[error("Failed to reach upstream: {0}")]
    Transport(String),

    #[error("Failed to read upstream body: {0}")]
    Body(String),
}

/// Sends one request to a provider. Exactly one attempt, no retries.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, UpstreamFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacted_url_hides_query_key() {
        let request = OutboundRequest {
            url: "https://example.test/models/m:generateContent?key=s3cret".to_string(),
            headers: Vec::new(),
            body: json!({}),
            url_secret: Some("s3cret".to_string()),
        };
        assert_eq!(
            request.redacted_url(),
            "https://example.test/models/m:generateContent?key=***"
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = OutboundRequest {
            url: String::new(),
            headers: vec![("Authorization".to_string(), "Bearer k".to_string())],
            body: json!({}),
            url_secret: None,
        };
        assert_eq!(request.header("authorization"), Some("Bearer k"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_success_range() {
        assert!(UpstreamResponse::new(200, "").is_success());
        assert!(!UpstreamResponse::new(429, "").is_success());
        assert!(!UpstreamResponse::new(503, "").is_success());
    }
}
