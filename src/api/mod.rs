// HTTP API Server module

use anyhow::Result;
use axum::{
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any as PanicPayload;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod client;
pub mod gemini;
mod handlers;
pub mod openai;

use crate::config::{AppConfig, Credentials};
use crate::proxy::router::ProviderRegistry;
use crate::proxy::upstream::Upstream;
use crate::proxy::{Orchestrator, ProxyError};
use client::HttpUpstream;

static SERVER_HANDLE: OnceCell<RwLock<Option<oneshot::Sender<()>>>> = OnceCell::new();

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: &AppConfig, credentials: Credentials, upstream: Arc<dyn Upstream>) -> Self {
        let orchestrator = Orchestrator::new(
            ProviderRegistry::from_config(config),
            credentials,
            upstream,
            config.upstream_timeout(),
        );

        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Turn a panic in the request path into the regular internal error envelope
fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "request handler panicked".to_string()
    };

    tracing::error!("Request handler panicked: {}", message);
    ProxyError::internal(message).into_response()
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/chat", any(handlers::chat))
        .route("/api/chat", any(handlers::chat))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}

pub async fn start_server(config: AppConfig, credentials: Credentials) -> Result<()> {
    let addr = config.bind_addr();
    let state = AppState::new(&config, credentials, Arc::new(HttpUpstream::new()));

    for entry in state.orchestrator.registry().iter() {
        let provider = entry.config.provider;
        tracing::info!(
            "Provider {}: model={} configured={}",
            provider,
            entry.settings.model,
            state.orchestrator.credentials().is_configured(provider)
        );
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Chat relay listening on {}", addr);

    let (tx, rx) = oneshot::channel::<()>();

    SERVER_HANDLE
        .get_or_init(|| RwLock::new(None))
        .write()
        .replace(tx);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            rx.await.ok();
        })
        .await?;

    Ok(())
}

pub async fn stop_server() -> Result<()> {
    if let Some(lock) = SERVER_HANDLE.get() {
        if let Some(tx) = lock.write().take() {
            let _ = tx.send(());
            tracing::info!("Chat relay stopped");
        }
    }
    Ok(())
}
