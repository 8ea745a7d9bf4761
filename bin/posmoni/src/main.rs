mod cli;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(cli.verbosity.directive()),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting posmoni with verbosity {:?}", cli.verbosity);

    match cli.command {
        Commands::Monitor(args) => args.run().await,
        Commands::TrackSync(args) => args.run().await,
    }
}
