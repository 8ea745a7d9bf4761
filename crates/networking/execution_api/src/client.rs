use std::time::Duration;

use async_trait::async_trait;
use posmoni_api_types::{
    endpoint::EndpointResult,
    error::ApiError,
    json_rpc::{JsonRpcRequest, JsonRpcResponse},
    sync::EthSyncing,
};
use posmoni_transport::{
    http_client::RetryingTransport, poller::poll_endpoints, retry::BackoffPolicy,
};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ExecutionApi;

pub const ETH_SYNCING: &str = "eth_syncing";

async fn call_json_rpc(
    transport: &RetryingTransport,
    endpoint: &str,
    method: &str,
    params: Vec<Value>,
    retry_budget: Duration,
) -> Result<Value, ApiError> {
    let url = Url::parse(endpoint)?;
    let request = JsonRpcRequest::new(method, params);

    let response = transport
        .execute(transport.post_json(url.clone(), &request), retry_budget)
        .await?;
    let status_code = response.status();
    let body = response.text().await.map_err(ApiError::ReadBody)?;

    if !status_code.is_success() {
        return Err(ApiError::RequestFailed {
            url,
            status_code,
            body,
        });
    }

    serde_json::from_str::<JsonRpcResponse>(&body)?.into_result()
}

async fn fetch_eth_syncing(
    transport: RetryingTransport,
    endpoint: String,
    retry_budget: Duration,
) -> Result<EthSyncing, ApiError> {
    let result = call_json_rpc(&transport, &endpoint, ETH_SYNCING, vec![], retry_budget).await?;
    debug!("eth_syncing result of {endpoint}: {result}");
    Ok(serde_json::from_value(result)?)
}

/// JSON-RPC client for execution nodes. Every call names its endpoint explicitly.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    transport: RetryingTransport,
    retry_budget: Duration,
}

impl ExecutionClient {
    pub fn new(request_timeout: Duration, retry_budget: Duration) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            RetryingTransport::new(request_timeout, BackoffPolicy::default())?,
            retry_budget,
        ))
    }

    pub fn with_transport(transport: RetryingTransport, retry_budget: Duration) -> Self {
        Self {
            transport,
            retry_budget,
        }
    }
}

#[async_trait]
impl ExecutionApi for ExecutionClient {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, ApiError> {
        call_json_rpc(&self.transport, endpoint, method, params, self.retry_budget).await
    }

    async fn sync_status(&self, endpoints: &[String]) -> Vec<EndpointResult<EthSyncing>> {
        if endpoints.is_empty() {
            warn!("No endpoints provided for sync status check");
            return vec![];
        }

        let retry_budget = self.retry_budget;
        poll_endpoints(endpoints, |endpoint| {
            fetch_eth_syncing(self.transport.clone(), endpoint, retry_budget)
        })
        .await
    }
}
