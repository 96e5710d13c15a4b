//! Aptos Snap Host
//!
//! Runs the snap core behind `POST /rpc` on a local port.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aptos_snap::crypto::mnemonic::{generate_mnemonic, MnemonicStrength};
use aptos_snap_host::config::{Cli, Command, HostConfig};
use aptos_snap_host::rpc::app;
use aptos_snap_host::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config).await,
        Command::GenerateMnemonic { words } => {
            let strength = match words {
                12 => MnemonicStrength::Words12,
                24 => MnemonicStrength::Words24,
                other => bail!("unsupported word count {}, use 12 or 24", other),
            };
            println!("{}", generate_mnemonic(strength)?);
            Ok(())
        }
    }
}

async fn serve(config: HostConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);

    tracing::info!(
        "Starting Aptos snap host v{} on {} ({} at {})",
        aptos_snap::VERSION,
        config.listen_addr,
        config.network,
        state.provider_config.url
    );
    tracing::info!("State file: {}", config.state_path.display());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Aptos snap host stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
