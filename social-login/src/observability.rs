//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install the global JSON subscriber
///
/// `service.log_level` accepts any `EnvFilter` directive (e.g.
/// `info,social_login=debug`); an invalid directive falls back to `info`.
/// Calling this twice is harmless: the second subscriber is not installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already installed");
        return Ok(());
    }

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

/// Flush logging before exit
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        let config = Config::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}
