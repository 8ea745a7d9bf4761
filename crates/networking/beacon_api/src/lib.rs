pub mod client;
pub mod subscriber;

use async_trait::async_trait;
use posmoni_api_types::{
    endpoint::EndpointResult, error::ApiError, id::StateId, sync::SyncStatus,
    validator::ValidatorBalance,
};

/// Beacon node REST API as seen by the monitor.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// Sets the endpoints point queries are sent to. Only the first one is used for now.
    fn set_endpoints(&mut self, endpoints: Vec<String>) -> Result<(), ApiError>;

    async fn validator_balances(
        &self,
        state_id: &StateId,
        validator_indices: &[String],
    ) -> Result<Vec<ValidatorBalance>, ApiError>;

    /// `GET /eth/v1/beacon/health` against every endpoint, `Ok(())` means healthy.
    async fn health_check(&self, endpoints: &[String]) -> Vec<EndpointResult<()>>;

    /// `GET /eth/v1/node/syncing` against every endpoint.
    async fn sync_status(&self, endpoints: &[String]) -> Vec<EndpointResult<SyncStatus>>;
}
