//! Entry point for the `gpuhost` agent.

use std::sync::Arc;

use gpuhost_gateway::{config::GatewayConfig, routes::create_router, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    if config.token_generated {
        info!(token = config.operator_token.expose(), "generated operator token");
    }

    let addr = config.listen_addr;
    let state = Arc::new(AppState::from_config(&config));
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %addr,
        url = %config.advertised_url(),
        runner = %config.sandbox.runner_path.display(),
        "gpuhost agent listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
