//! gov-slack-addon entry point.

use addon_runtime::{logging, AddonConfig, AddonRuntime, Cli, Command, ServeArgs};
use anyhow::{Context, Result};
use clap::Parser;
use shared_types::APP_NAME;
use tracing::{info, info_span, Instrument};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(*args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = AddonConfig::from_args(args).context("invalid configuration")?;

    logging::init(config.logging)?;

    let root = info_span!("root", app = APP_NAME);
    root.in_scope(|| {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            listen = %config.http.listen,
            interval = ?config.reconciler.interval,
            locking = config.reconciler.locking,
            "starting gov-slack-addon"
        )
    });

    AddonRuntime::new(config).run().instrument(root).await
}
