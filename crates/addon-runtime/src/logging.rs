//! Tracing subscriber setup.
//!
//! JSON lines by default, human readable with `--pretty`. `RUST_LOG`
//! overrides the level chosen by `--debug`.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

fn filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: LoggingConfig) -> Result<()> {
    let builder = fmt().with_env_filter(filter(config.debug)).with_target(true);

    let installed = if config.pretty {
        builder.pretty().try_init()
    } else {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
    };

    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
