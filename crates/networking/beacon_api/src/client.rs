use std::time::Duration;

use async_trait::async_trait;
use posmoni_api_types::{
    endpoint::EndpointResult, error::ApiError, id::StateId, responses::DataResponse,
    sync::SyncStatus, validator::ValidatorBalance,
};
use posmoni_transport::{
    http_client::RetryingTransport, poller::poll_endpoints, retry::BackoffPolicy,
};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::ConsensusApi;

pub const HEALTH_PATH: &str = "/eth/v1/beacon/health";
pub const SYNCING_PATH: &str = "/eth/v1/node/syncing";

/// Appends `path` to `endpoint` verbatim, keeping any path prefix the endpoint already has.
pub fn endpoint_url(endpoint: &str, path: &str) -> Result<Url, ApiError> {
    Ok(Url::parse(&format!(
        "{}{path}",
        endpoint.trim_end_matches('/')
    ))?)
}

async fn get_json<T: DeserializeOwned>(
    transport: &RetryingTransport,
    url: Url,
    retry_budget: Duration,
) -> Result<T, ApiError> {
    let response = transport
        .execute(transport.get(url.clone()), retry_budget)
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

    Ok(serde_json::from_str(&body)?)
}

async fn fetch_health(
    transport: RetryingTransport,
    endpoint: String,
    retry_budget: Duration,
) -> Result<(), ApiError> {
    let url = endpoint_url(&endpoint, HEALTH_PATH)?;
    let response = transport.execute(transport.get(url), retry_budget).await?;
    match response.status() {
        StatusCode::OK => Ok(()),
        status_code => Err(ApiError::Unhealthy { status_code }),
    }
}

async fn fetch_sync_status(
    transport: RetryingTransport,
    endpoint: String,
    retry_budget: Duration,
) -> Result<SyncStatus, ApiError> {
    let url = endpoint_url(&endpoint, SYNCING_PATH)?;
    let response: DataResponse<SyncStatus> = get_json(&transport, url, retry_budget).await?;
    debug!("Sync status of {endpoint}: {:?}", response.data);
    Ok(response.data)
}

#[derive(Debug, Clone)]
pub struct BeaconApiClient {
    transport: RetryingTransport,
    endpoint: Option<String>,
    retry_budget: Duration,
}

impl BeaconApiClient {
    pub fn new(request_timeout: Duration, retry_budget: Duration) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            RetryingTransport::new(request_timeout, BackoffPolicy::default())?,
            retry_budget,
        ))
    }

    pub fn with_transport(transport: RetryingTransport, retry_budget: Duration) -> Self {
        Self {
            transport,
            endpoint: None,
            retry_budget,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl ConsensusApi for BeaconApiClient {
    fn set_endpoints(&mut self, endpoints: Vec<String>) -> Result<(), ApiError> {
        let endpoint = endpoints.into_iter().next().ok_or(ApiError::NoEndpoints)?;
        Url::parse(&endpoint)?;
        self.endpoint = Some(endpoint);
        Ok(())
    }

    async fn validator_balances(
        &self,
        state_id: &StateId,
        validator_indices: &[String],
    ) -> Result<Vec<ValidatorBalance>, ApiError> {
        let endpoint = self.endpoint.as_deref().ok_or(ApiError::NoEndpoints)?;
        let url = endpoint_url(
            endpoint,
            &format!(
                "/eth/v1/beacon/states/{state_id}/validator_balances?id={}",
                validator_indices.join(",")
            ),
        )?;

        let response: DataResponse<Vec<ValidatorBalance>> =
            get_json(&self.transport, url, self.retry_budget).await?;
        Ok(response.data)
    }

    async fn health_check(&self, endpoints: &[String]) -> Vec<EndpointResult<()>> {
        if endpoints.is_empty() {
            warn!("No endpoints provided for health check");
            return vec![];
        }

        let retry_budget = self.retry_budget;
        poll_endpoints(endpoints, |endpoint| {
            fetch_health(self.transport.clone(), endpoint, retry_budget)
        })
        .await
    }

    async fn sync_status(&self, endpoints: &[String]) -> Vec<EndpointResult<SyncStatus>> {
        if endpoints.is_empty() {
            warn!("No endpoints provided for sync status check");
            return vec![];
        }

        let retry_budget = self.retry_budget;
        poll_endpoints(endpoints, |endpoint| {
            fetch_sync_status(self.transport.clone(), endpoint, retry_budget)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;

    fn client() -> BeaconApiClient {
        let policy = BackoffPolicy {
            initial_interval: Duration::from_millis(10),
            ..BackoffPolicy::default()
        };
        let transport = RetryingTransport::new(Duration::from_secs(5), policy.without_jitter())
            .expect("client builds");
        BeaconApiClient::with_transport(transport, Duration::from_millis(100))
    }

    fn unreachable_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let port = listener.local_addr().expect("local address").port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[test]
    fn test_endpoint_url_keeps_prefix() {
        let url = endpoint_url("http://localhost:5052/lighthouse/", SYNCING_PATH)
            .expect("valid endpoint");

        assert_eq!(url.as_str(), "http://localhost:5052/lighthouse/eth/v1/node/syncing");
    }

    #[test]
    fn test_set_endpoints_requires_one() {
        let mut client = client();

        assert!(matches!(
            client.set_endpoints(vec![]),
            Err(ApiError::NoEndpoints)
        ));
        assert!(client.set_endpoints(vec!["not a url".to_string()]).is_err());

        client
            .set_endpoints(vec![
                "http://localhost:5052".to_string(),
                "http://localhost:5053".to_string(),
            ])
            .expect("valid endpoints");
        assert_eq!(client.endpoint(), Some("http://localhost:5052"));
    }

    #[tokio::test]
    async fn test_validator_balances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/eth/v1/beacon/states/head/validator_balances"))
            .and(query_param("id", "1,2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "execution_optimistic": false,
                "finalized": false,
                "data": [
                    {"index": "1", "balance": "32000136946"},
                    {"index": "2", "balance": "31999136946"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client();
        client
            .set_endpoints(vec![server.uri()])
            .expect("valid endpoint");

        let balances = client
            .validator_balances(&StateId::Head, &["1".to_string(), "2".to_string()])
            .await
            .expect("balances returned");

        assert_eq!(
            balances,
            vec![
                ValidatorBalance {
                    index: "1".to_string(),
                    balance: "32000136946".to_string()
                },
                ValidatorBalance {
                    index: "2".to_string(),
                    balance: "31999136946".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_validator_balances_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid validator ID"))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client();
        client
            .set_endpoints(vec![server.uri()])
            .expect("valid endpoint");

        let err = client
            .validator_balances(&StateId::Slot(100), &["0xwwww".to_string()])
            .await
            .expect_err("bad request");

        match err {
            ApiError::RequestFailed {
                status_code, body, ..
            } => {
                assert_eq!(status_code, StatusCode::BAD_REQUEST);
                assert_eq!(body, "Invalid validator ID");
            }
            other => panic!("expected request failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validator_balances_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{"))
            .mount(&server)
            .await;

        let mut client = client();
        client
            .set_endpoints(vec![server.uri()])
            .expect("valid endpoint");

        let err = client
            .validator_balances(&StateId::Head, &["1".to_string()])
            .await
            .expect_err("malformed body");

        assert!(matches!(err, ApiError::JsonDecode(_)));
    }

    #[tokio::test]
    async fn test_validator_balances_without_endpoint() {
        let err = client()
            .validator_balances(&StateId::Head, &["1".to_string()])
            .await
            .expect_err("no endpoint configured");

        assert!(matches!(err, ApiError::NoEndpoints));
    }

    #[tokio::test]
    async fn test_sync_status_isolates_failures() {
        let synced = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SYNCING_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "head_slot": "4120384",
                    "sync_distance": "0",
                    "is_syncing": false,
                    "is_optimistic": false,
                    "el_offline": false
                }
            })))
            .mount(&synced)
            .await;

        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SYNCING_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&broken)
            .await;

        let unreachable = unreachable_endpoint();
        let endpoints = vec![synced.uri(), broken.uri(), unreachable.clone()];

        let results = client().sync_status(&endpoints).await;

        assert_eq!(results.len(), 3);
        for result in results {
            if result.endpoint == synced.uri() {
                let status = result.result.expect("synced endpoint answers");
                assert!(!status.is_syncing);
                assert_eq!(status.head_slot, 4120384);
            } else if result.endpoint == broken.uri() {
                assert!(matches!(
                    result.result,
                    Err(ApiError::RequestFailed { status_code, .. })
                        if status_code == StatusCode::INTERNAL_SERVER_ERROR
                ));
            } else {
                assert_eq!(result.endpoint, unreachable);
                assert!(matches!(result.result, Err(ApiError::Transport(_))));
            }
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let healthy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&healthy)
            .await;

        let syncing = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(206))
            .mount(&syncing)
            .await;

        let results = client()
            .health_check(&[healthy.uri(), syncing.uri()])
            .await;

        assert_eq!(results.len(), 2);
        for result in results {
            if result.endpoint == healthy.uri() {
                assert!(result.is_ok());
            } else {
                assert!(matches!(
                    result.result,
                    Err(ApiError::Unhealthy { status_code })
                        if status_code == StatusCode::PARTIAL_CONTENT
                ));
            }
        }
    }

    #[tokio::test]
    async fn test_empty_endpoint_lists() {
        let client = client();

        assert!(client.health_check(&[]).await.is_empty());
        assert!(client.sync_status(&[]).await.is_empty());
    }
}
