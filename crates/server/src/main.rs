mod api;
mod auth;
mod cli;
mod db;
mod imports;
mod jobs;
mod messaging;
mod repo;
mod router;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bow_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = bow_core::Config::from_env();
    let args = cli::Cli::parse();
    cli::run(args, config).await
}
