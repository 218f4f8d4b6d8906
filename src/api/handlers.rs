// API request handlers

use axum::{
    extract::State,
    http::Method,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::Instrument;

use super::AppState;

// Root endpoint
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let orchestrator = &state.orchestrator;
    let providers: Vec<Value> = orchestrator
        .registry()
        .iter()
        .map(|entry| {
            let provider = entry.config.provider;
            json!({
                "key": provider.key(),
                "model": entry.settings.model,
                "configured": orchestrator.credentials().is_configured(provider),
            })
        })
        .collect();

    Json(json!({
        "message": "Chat Relay",
        "endpoints": [
            "POST /chat",
            "POST /api/chat",
            "GET /health"
        ],
        "providers": providers
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn chat(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("chat", request_id = %request_id);

    async move {
        match state.orchestrator.handle(&method, &body).await {
            Ok(reply) => Json(reply).into_response(),
            Err(e) => {
                tracing::info!("Request failed ({:?}): {}", e.kind(), e);
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
