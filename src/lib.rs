// Chat Relay - routes browser chat conversations to LLM providers

pub mod api;
pub mod config;
pub mod proxy;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "chat_relay=info,tower_http=info";

/// Startup options that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

pub async fn run(options: RunOptions) -> Result<()> {
    let config_path = options
        .config_path
        .unwrap_or_else(config::default_config_path);

    let mut app_config = config::load_config(&config_path)?;
    tracing::info!("Config loaded from {:?}", config_path);
    if let Some(host) = options.host {
        app_config.host = host;
    }
    if let Some(port) = options.port {
        app_config.port = port;
    }

    let credentials = config::Credentials::from_env();

    let mut server = tokio::spawn(api::start_server(app_config, credentials));

    tokio::select! {
        result = &mut server => result??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            api::stop_server().await?;
            server.await??;
        }
    }

    Ok(())
}
