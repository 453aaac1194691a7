//! Logging initialization
//!
//! Console tracing with an env-filter: the configured level is the default
//! and RUST_LOG overrides it per target.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(())
}
