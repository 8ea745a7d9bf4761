use std::{sync::Arc, time::Duration};

use posmoni_beacon_api::{
    ConsensusApi,
    subscriber::{SubscribeOptions, subscribe},
};
use posmoni_execution_api::ExecutionApi;
use posmoni_storage::{errors::StoreError, record::ValidatorRecord, repository::Repository};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::{MonitorConfig, Subsystem},
    error::{ConfigError, MonitorError},
    performance::ValidatorPerformanceTracker,
    sync_tracker::{EndpointSyncStatus, track_sync},
};

/// Entry point tying the beacon and execution clients, the checkpoint subscription and the
/// validator repository together.
pub struct Eth2Monitor {
    repository: Arc<dyn Repository>,
    consensus: Arc<dyn ConsensusApi>,
    execution: Arc<dyn ExecutionApi>,
    subscribe_options: SubscribeOptions,
    config: MonitorConfig,
}

impl Eth2Monitor {
    /// Wires the monitor up and migrates the repository.
    ///
    /// The configured consensus endpoints replace whatever `subscribe_options` and `consensus`
    /// were pointed at.
    pub fn new<C, E>(
        repository: Arc<dyn Repository>,
        mut consensus: C,
        execution: E,
        mut subscribe_options: SubscribeOptions,
        config: MonitorConfig,
    ) -> Result<Self, MonitorError>
    where
        C: ConsensusApi + 'static,
        E: ExecutionApi + 'static,
    {
        if config.consensus.is_empty() {
            return Err(ConfigError::NoConsensusEndpoints.into());
        }

        let endpoints = config.consensus_endpoints();
        consensus.set_endpoints(endpoints.clone())?;
        subscribe_options.endpoints = endpoints;

        debug!("Configuration: {config:?}");

        repository.migrate().map_err(MonitorError::Migration)?;

        Ok(Self {
            repository,
            consensus: Arc::new(consensus),
            execution: Arc::new(execution),
            subscribe_options,
            config,
        })
    }

    /// Starts the checkpoint subscription and validator tracking.
    ///
    /// Both stop once every returned token is cancelled.
    pub fn monitor(&self) -> Result<Vec<CancellationToken>, MonitorError> {
        self.config.validate(Subsystem::Monitor)?;

        let subscription = CancellationToken::new();
        let checkpoints = subscribe(subscription.clone(), self.subscribe_options.clone());

        let tracker = ValidatorPerformanceTracker::new(
            self.consensus.clone(),
            self.repository.clone(),
            self.config.validators.clone(),
            self.config.balances_state.clone(),
        );
        tokio::spawn(tracker.run(checkpoints));

        Ok(vec![subscription])
    }

    pub fn track_sync(
        &self,
        cancel: CancellationToken,
        consensus_endpoints: Vec<String>,
        execution_endpoints: Vec<String>,
        interval: Duration,
    ) -> mpsc::UnboundedReceiver<EndpointSyncStatus> {
        track_sync(
            cancel,
            self.consensus.clone(),
            self.execution.clone(),
            consensus_endpoints,
            execution_endpoints,
            interval,
        )
    }

    pub fn validator(&self, idx: u64) -> Result<Option<ValidatorRecord>, StoreError> {
        self.repository.validator(idx)
    }
}
