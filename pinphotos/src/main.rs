// pinphotos - map pins with locally cached photo collections
// Entry point and application setup

use anyhow::Context;
use clap::Parser;
use pinphotos::cli::{resolve_data_dir, Cli};
use pinphotos::{app, commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinphotos=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting pinphotos");

    let data_dir = resolve_data_dir(cli.data_dir)
        .context("Could not determine a data directory; pass --data-dir")?;

    let state = app::setup(data_dir)
        .await
        .context("Failed to initialize application")?;

    commands::execute(&state, cli.command).await?;

    Ok(())
}
