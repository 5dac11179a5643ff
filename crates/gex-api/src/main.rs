//! Gremlin Explorer API Server

use anyhow::Context;
use gex_api::{create_router, state::AppState};
use gex_core::{AppConfig, LoggingConfig};
use gex_gremlin::GremlinSessionFactory;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sessions = Arc::new(GremlinSessionFactory::new(config.gremlin.clone()));
    let state = Arc::new(AppState::new(config, sessions));

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Gremlin Explorer API starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// `GEX_CONFIG` names a TOML file; environment variables override it
fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("GEX_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        Err(_) => AppConfig::from_env().context("Invalid configuration in environment")?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "gex_api={level},gex_core={level},gex_gremlin={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
    state.set_ready(false);
}
