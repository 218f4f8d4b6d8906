// HTTP client for provider calls

use async_trait::async_trait;
use std::time::Duration;

use crate::proxy::upstream::{OutboundRequest, Upstream, UpstreamFailure, UpstreamResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    http_client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self { http_client }
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, UpstreamFailure> {
        let payload = serde_json::to_vec(&request.body)
            .map_err(|e| UpstreamFailure::Transport(e.to_string()))?;

        // Content-Type comes from the adapter's header list
        let mut builder = self.http_client.post(&request.url).body(payload);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // Dropping this future (client went away) aborts the connection
        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamFailure::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamFailure::Body(e.without_url().to_string()))?;

        Ok(UpstreamResponse::new(status, body))
    }
}
