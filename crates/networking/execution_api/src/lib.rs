pub mod client;

use async_trait::async_trait;
use posmoni_api_types::{endpoint::EndpointResult, error::ApiError, sync::EthSyncing};
use serde_json::Value;

/// Execution node JSON-RPC API as seen by the monitor.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Calls `method` on `endpoint` and returns the raw `result` field.
    async fn call(&self, endpoint: &str, method: &str, params: Vec<Value>)
    -> Result<Value, ApiError>;

    /// `eth_syncing` against every endpoint.
    async fn sync_status(&self, endpoints: &[String]) -> Vec<EndpointResult<EthSyncing>>;
}
