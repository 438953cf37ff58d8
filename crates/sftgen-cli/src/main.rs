//! sftgen CLI - Build instruction-tuning datasets from the command line.

use anyhow::Context;
use clap::Parser;
use sftgen_cli::commands;
use sftgen_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr so stdout stays clean for previews and config output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let formatter = Formatter::new(!cli.no_color);

    match cli.command {
        Command::Text(args) => commands::execute_text(args, &config, &cli.endpoint, &formatter).await?,
        Command::Caption(args) => commands::execute_caption(args, &config, &cli.endpoint, &formatter).await?,
        Command::Config(args) => commands::execute_config(args, &config, &config_path, &formatter)?,
    }

    Ok(())
}
