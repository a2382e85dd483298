//! mason - prebuilt C/C++ package installer CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mason_cli::cmd::{self, Context};
use mason_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Install { packages, kind } => cmd::install::install(&ctx, &packages, kind).await,
        Commands::Link { packages, kind } => cmd::link::link(&ctx, &packages, kind).await,
        Commands::Status => cmd::status::status(&ctx).await,
    }
}
