//! Process-wide `tracing` subscriber setup.

use std::sync::Once;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the fmt subscriber once. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| anyhow!("invalid log level '{level}': {e}"))?,
    };

    let mut result = Ok(());
    INIT.call_once(|| {
        let installed = if json {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
        };
        result = installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"));
    });
    result?;

    tracing::debug!(level, json, "logging initialized");
    Ok(())
}
