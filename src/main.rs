mod app;
mod classifier;
mod cli;
mod config;
mod db;
mod domain;
mod infrastructure;
mod page;
mod tasks;

use anyhow::Result;
use clap::Parser;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::GuardApp::initialize(config, &paths).await?;
    app.run(cli.command, shutdown).await
}
