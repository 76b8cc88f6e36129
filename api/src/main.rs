//! Forge API - Main Entry Point

use clap::Parser;
use forge_api::{bind_address, build_router, AppState, ForgeConfig};
use forge_billing::{LedgerBillingProvider, LocalDriver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forge-api")]
#[command(version)]
#[command(about = "Forge control plane API server", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short, env = "FORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the configured one
    #[arg(long, env = "FORGE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Forge API v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = ForgeConfig::load_or_default(cli.config.as_deref())?;
    let addr = bind_address(&config, cli.bind.as_deref())?;

    let driver = Arc::new(LocalDriver::new(Duration::from_millis(config.driver.delay_ms)));
    let provider = Arc::new(LedgerBillingProvider::new());
    let state = AppState::new(config, provider, driver)?;
    let gate = state.gate.clone();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        })
        .await?;

    gate.settle().await;
    Ok(())
}
