use clap::Parser;
use std::sync::Arc;
use tracing::info;

use netdiag_server::config::{CliArgs, ServerConfig};
use netdiag_server::server;
use netdiag_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netdiag_server=info,tower_http=info".into()),
        )
        .init();

    let args = CliArgs::parse();
    info!("Starting netdiag-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Data dir: {:?}", args.data_dir);

    let config = ServerConfig::from_args(args);
    let bind_addr = format!("{}:{}", config.bind, config.port);

    let state = Arc::new(AppState::new(config)?);

    let router = server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal");
}
