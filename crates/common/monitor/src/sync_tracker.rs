use std::{sync::Arc, time::Duration};

use posmoni_api_types::{endpoint::EndpointResult, error::ApiError, sync::SyncState};
use posmoni_beacon_api::ConsensusApi;
use posmoni_execution_api::ExecutionApi;
use tokio::{sync::mpsc, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of polling one endpoint once. `synced` is always `false` when `error` is set.
#[derive(Debug)]
pub struct EndpointSyncStatus {
    pub endpoint: String,
    pub synced: bool,
    pub error: Option<ApiError>,
}

impl<S: SyncState> From<EndpointResult<S>> for EndpointSyncStatus {
    fn from(result: EndpointResult<S>) -> Self {
        let EndpointResult { endpoint, result } = result;
        match result {
            Ok(status) => {
                let synced = !status.is_syncing();
                if synced {
                    info!("Endpoint {endpoint} is synced");
                } else {
                    info!("Endpoint {endpoint} is syncing");
                }
                Self {
                    endpoint,
                    synced,
                    error: None,
                }
            }
            Err(err) => {
                error!("Error checking sync status of {endpoint}: {err}");
                Self {
                    endpoint,
                    synced: false,
                    error: Some(err),
                }
            }
        }
    }
}

pub struct SyncTracker {
    pub consensus: Arc<dyn ConsensusApi>,
    pub execution: Arc<dyn ExecutionApi>,
    pub consensus_endpoints: Vec<String>,
    pub execution_endpoints: Vec<String>,
    pub interval: Duration,
}

impl SyncTracker {
    /// Polls every consensus endpoint, then every execution endpoint, and emits one status per
    /// endpoint. Returns `false` once the receiver is gone.
    pub async fn poll_once(&self, sender: &mpsc::UnboundedSender<EndpointSyncStatus>) -> bool {
        let consensus = self
            .consensus
            .sync_status(&self.consensus_endpoints)
            .await
            .into_iter()
            .map(EndpointSyncStatus::from);
        for status in consensus {
            if sender.send(status).is_err() {
                return false;
            }
        }

        let execution = self
            .execution
            .sync_status(&self.execution_endpoints)
            .await
            .into_iter()
            .map(EndpointSyncStatus::from);
        for status in execution {
            if sender.send(status).is_err() {
                return false;
            }
        }

        true
    }

    /// Polls right away, then again `interval` after each round completes.
    ///
    /// Cancellation is only observed between rounds, a round in flight always finishes. The
    /// returned receiver closes once the loop stops.
    pub fn spawn(self, cancel: CancellationToken) -> mpsc::UnboundedReceiver<EndpointSyncStatus> {
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() || !self.poll_once(&sender).await {
                    break;
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.interval) => {}
                }
            }
            debug!("Sync tracking stopped");
        });

        receiver
    }
}

pub fn track_sync(
    cancel: CancellationToken,
    consensus: Arc<dyn ConsensusApi>,
    execution: Arc<dyn ExecutionApi>,
    consensus_endpoints: Vec<String>,
    execution_endpoints: Vec<String>,
    interval: Duration,
) -> mpsc::UnboundedReceiver<EndpointSyncStatus> {
    SyncTracker {
        consensus,
        execution,
        consensus_endpoints,
        execution_endpoints,
        interval,
    }
    .spawn(cancel)
}
