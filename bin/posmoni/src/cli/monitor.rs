use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use posmoni_beacon_api::{
    client::BeaconApiClient,
    subscriber::{SseSubscriber, SubscribeOptions},
};
use posmoni_execution_api::client::ExecutionClient;
use posmoni_monitor::{
    config::{BalancesStateRef, MonitorConfig, Subsystem},
    monitor::Eth2Monitor,
};
use posmoni_storage::db::MonitorDB;
use posmoni_transport::{http_client::RetryingTransport, retry::BackoffPolicy};
use tracing::info;
use url::Url;

use crate::cli::{ConnectionArgs, constants::DEFAULT_DATA_DIR, shutdown_on_ctrl_c};

#[derive(Debug, Parser)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(
        long,
        env = "PM_VALIDATORS",
        value_delimiter = ',',
        help = "Indices of the validators to track"
    )]
    pub validators: Vec<String>,

    #[arg(
        long,
        env = "PM_VALIDATORS_EXTERNAL_HTTP",
        value_delimiter = ',',
        help = "HTTP endpoints returning a JSON array of additional validator indices"
    )]
    pub validators_external_http: Vec<Url>,

    #[arg(
        long,
        env = "PM_BALANCES_STATE",
        help = "State to read balances from: head, finalized, a slot, a state root, or checkpoint to follow each finalized checkpoint"
    )]
    pub balances_state: Option<BalancesStateRef>,

    #[arg(
        long,
        env = "PM_DATA_DIR",
        help = "The directory for storing validator records. Ignored with --ephemeral"
    )]
    pub data_dir: Option<PathBuf>,

    #[arg(long, short, help = "Keep validator records in memory only")]
    pub ephemeral: bool,
}

impl MonitorArgs {
    pub fn load(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = self.connection.load()?;

        if !self.validators.is_empty() {
            config.validators = self.validators.clone();
        }
        if !self.validators_external_http.is_empty() {
            config.validators_external_http = self.validators_external_http.clone();
        }
        if let Some(balances_state) = &self.balances_state {
            config.balances_state = balances_state.clone();
        }

        Ok(config)
    }

    fn open_db(&self) -> anyhow::Result<MonitorDB> {
        if self.ephemeral {
            info!("Keeping validator records in memory");
            return MonitorDB::ephemeral().context("Failed to create in-memory database");
        }

        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        MonitorDB::new(data_dir).context("Failed to open database")
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let request_timeout = self.connection.request_timeout;
        let transport = RetryingTransport::new(request_timeout, BackoffPolicy::default())?;
        let config = self.load()?.merge_external_validators(&transport).await;
        config.validate(Subsystem::Monitor)?;

        info!(
            "Monitoring {} validators through {} consensus endpoints",
            config.validators.len(),
            config.consensus.len()
        );

        let monitor = Eth2Monitor::new(
            Arc::new(self.open_db()?),
            BeaconApiClient::with_transport(transport.clone(), config.retry_budget),
            ExecutionClient::with_transport(transport, config.retry_budget),
            SubscribeOptions::finalized_checkpoints(vec![], Arc::new(SseSubscriber::default())),
            config,
        )?;
        let tokens = monitor.monitor()?;

        shutdown_on_ctrl_c(tokens).await
    }
}
