pub mod constants;
pub mod monitor;
pub mod track_sync;
pub mod verbosity;

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use posmoni_monitor::config::MonitorConfig;
use tokio::{signal, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::cli::{
    constants::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_VERBOSITY, SHUTDOWN_GRACE_PERIOD},
    monitor::MonitorArgs,
    track_sync::TrackSyncArgs,
    verbosity::{Verbosity, verbosity_parser},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Verbosity level (1=error, 2=warn, 3=info, 4=debug, 5=trace), ignored when RUST_LOG is set",
        default_value = DEFAULT_VERBOSITY,
        value_parser = verbosity_parser
    )]
    pub verbosity: Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track validator balances and missed attestations on every finalized checkpoint
    #[command(name = "monitor")]
    Monitor(MonitorArgs),

    /// Periodically report whether consensus and execution nodes are synced
    #[command(name = "track-sync")]
    TrackSync(TrackSyncArgs),
}

/// Node endpoints and request settings shared by every command.
#[derive(Debug, Parser)]
pub struct ConnectionArgs {
    #[arg(long, env = "PM_CONFIG", help = "Path to a YAML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "PM_CONSENSUS",
        value_delimiter = ',',
        help = "Beacon node HTTP endpoints"
    )]
    pub consensus: Vec<Url>,

    #[arg(
        long,
        env = "PM_EXECUTION",
        value_delimiter = ',',
        help = "Execution node JSON-RPC endpoints"
    )]
    pub execution: Vec<Url>,

    #[arg(long, env = "PM_REQUEST_TIMEOUT", help = "Timeout of a single HTTP request in seconds", default_value = DEFAULT_REQUEST_TIMEOUT, value_parser = duration_parser)]
    pub request_timeout: Duration,

    #[arg(long, env = "PM_RETRY_BUDGET", help = "Seconds a request may spend retrying connection failures [default: 60, 1 for track-sync]", value_parser = duration_parser)]
    pub retry_budget: Option<Duration>,
}

impl ConnectionArgs {
    /// Reads the configuration file, if any, and lets flags and `PM_*` variables override it.
    pub fn load(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => MonitorConfig::default(),
        };

        if !self.consensus.is_empty() {
            config.consensus = self.consensus.clone();
        }
        if !self.execution.is_empty() {
            config.execution = self.execution.clone();
        }
        if let Some(retry_budget) = self.retry_budget {
            config.retry_budget = retry_budget;
        }

        Ok(config)
    }
}

pub fn duration_parser(duration_string: &str) -> Result<Duration, String> {
    Ok(Duration::from_secs(duration_string.parse().map_err(
        |err| format!("Could not parse the duration in seconds: {err:?}"),
    )?))
}

/// Waits for Ctrl-C, cancels every token and gives the subsystems a moment to wind down.
pub async fn shutdown_on_ctrl_c(tokens: Vec<CancellationToken>) -> anyhow::Result<()> {
    signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Received Ctrl-C, shutting down");

    for token in tokens {
        token.cancel();
    }
    sleep(SHUTDOWN_GRACE_PERIOD).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use posmoni_monitor::config::{BalancesStateRef, DEFAULT_RETRY_BUDGET};
    use tempdir::TempDir;

    use super::*;
    use crate::cli::constants::TRACK_SYNC_RETRY_BUDGET;

    #[test]
    fn test_cli_monitor_command() {
        let cli = Cli::parse_from([
            "posmoni",
            "monitor",
            "--consensus",
            "http://localhost:5052,http://localhost:5053",
            "--validators",
            "1,2",
            "--balances-state",
            "checkpoint",
            "--verbosity",
            "2",
        ]);

        assert_eq!(cli.verbosity, Verbosity::Warn);
        match cli.command {
            Commands::Monitor(args) => {
                let config = args.load().expect("configuration");
                assert_eq!(
                    config.consensus_endpoints(),
                    ["http://localhost:5052", "http://localhost:5053"]
                );
                assert_eq!(config.validators, ["1", "2"]);
                assert_eq!(config.balances_state, BalancesStateRef::Checkpoint);
                assert_eq!(config.retry_budget, DEFAULT_RETRY_BUDGET);
                assert!(!args.ephemeral);
            }
            Commands::TrackSync(_) => panic!("expected the monitor command"),
        }
    }

    #[test]
    fn test_cli_track_sync_command() {
        let cli = Cli::parse_from([
            "posmoni",
            "track-sync",
            "--consensus",
            "http://localhost:5052",
            "--execution",
            "http://localhost:8545",
            "--interval",
            "12",
            "--retry-budget",
            "5",
        ]);

        assert_eq!(cli.verbosity, Verbosity::Info);
        match cli.command {
            Commands::TrackSync(args) => {
                assert_eq!(args.interval, Duration::from_secs(12));
                let config = args.load().expect("configuration");
                assert_eq!(config.execution_endpoints(), ["http://localhost:8545"]);
                assert_eq!(config.retry_budget, Duration::from_secs(5));
            }
            Commands::Monitor(_) => panic!("expected the track-sync command"),
        }
    }

    #[test]
    fn test_track_sync_defaults_to_short_retry_budget() {
        let cli = Cli::parse_from([
            "posmoni",
            "track-sync",
            "--consensus",
            "http://localhost:5052",
            "--execution",
            "http://localhost:8545",
        ]);

        match cli.command {
            Commands::TrackSync(args) => {
                assert_eq!(args.interval, Duration::from_secs(60));
                let config = args.load().expect("configuration");
                assert_eq!(config.retry_budget, TRACK_SYNC_RETRY_BUDGET);
                assert_eq!(config.retry_budget, Duration::from_secs(1));
            }
            Commands::Monitor(_) => panic!("expected the track-sync command"),
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new("posmoni_cli").expect("temp dir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "consensus: [\"http://file-node:5052\"]\nexecution: [\"http://file-node:8545\"]\nretry_budget: 9\n",
        )
        .expect("config file");

        let args = ConnectionArgs::parse_from([
            "connection",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--consensus",
            "http://flag-node:5052",
        ]);
        let config = args.load().expect("configuration");

        assert_eq!(config.consensus_endpoints(), ["http://flag-node:5052"]);
        assert_eq!(config.execution_endpoints(), ["http://file-node:8545"]);
        assert_eq!(config.retry_budget, Duration::from_secs(9));
    }
}
