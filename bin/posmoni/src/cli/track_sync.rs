use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use posmoni_beacon_api::{
    client::BeaconApiClient,
    subscriber::{SseSubscriber, SubscribeOptions},
};
use posmoni_execution_api::client::ExecutionClient;
use posmoni_monitor::{
    config::{MonitorConfig, Subsystem},
    monitor::Eth2Monitor,
};
use posmoni_storage::repository::EmptyRepository;
use posmoni_transport::{http_client::RetryingTransport, retry::BackoffPolicy};
use tokio::{signal, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{
    ConnectionArgs,
    constants::{DEFAULT_SYNC_INTERVAL, SHUTDOWN_GRACE_PERIOD, TRACK_SYNC_RETRY_BUDGET},
    duration_parser,
};

#[derive(Debug, Parser)]
pub struct TrackSyncArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, env = "PM_INTERVAL", help = "Seconds to wait between two rounds of sync checks", default_value = DEFAULT_SYNC_INTERVAL, value_parser = duration_parser)]
    pub interval: Duration,
}

impl TrackSyncArgs {
    /// Sync checks give up on an unreachable node after a short budget unless
    /// `--retry-budget` says otherwise, so one dead endpoint does not stall a round.
    pub fn load(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = self.connection.load()?;
        config.retry_budget = self
            .connection
            .retry_budget
            .unwrap_or(TRACK_SYNC_RETRY_BUDGET);
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load()?;
        config.validate(Subsystem::TrackSync)?;

        let transport =
            RetryingTransport::new(self.connection.request_timeout, BackoffPolicy::default())?;
        let consensus_endpoints = config.consensus_endpoints();
        let execution_endpoints = config.execution_endpoints();

        let monitor = Eth2Monitor::new(
            Arc::new(EmptyRepository),
            BeaconApiClient::with_transport(transport.clone(), config.retry_budget),
            ExecutionClient::with_transport(transport, config.retry_budget),
            SubscribeOptions::finalized_checkpoints(vec![], Arc::new(SseSubscriber::default())),
            config,
        )?;

        let cancel = CancellationToken::new();
        let mut statuses = monitor.track_sync(
            cancel.clone(),
            consensus_endpoints,
            execution_endpoints,
            self.interval,
        );

        loop {
            tokio::select! {
                status = statuses.recv() => match status {
                    Some(status) => debug!("Sync status: {status:?}"),
                    None => break,
                },
                result = signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("Received Ctrl-C, shutting down");
                    cancel.cancel();
                    sleep(SHUTDOWN_GRACE_PERIOD).await;
                    break;
                }
            }
        }

        Ok(())
    }
}
