use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use social_login::prelude::*;

/// social-login - storefront sign-in through social identity providers
#[derive(Parser)]
#[command(name = "social-login")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations
    #[arg(short, long, env = "SOCIAL_LOGIN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(port) = cli.port {
        config.service.port = port;
    }

    init_tracing(&config)?;

    let state = AppState::new(config.clone()).context("failed to build application state")?;
    if !state.registry().is_enabled() {
        tracing::warn!("Social login is disabled; every login attempt will fail");
    }

    Server::new(config).serve(router(state)).await?;

    shutdown_tracing();
    Ok(())
}
