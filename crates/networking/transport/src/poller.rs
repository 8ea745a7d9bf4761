use std::future::Future;

use futures::{StreamExt, stream::FuturesUnordered};
use posmoni_api_types::{endpoint::EndpointResult, error::ApiError};

/// Runs `check` against every endpoint concurrently, one task per endpoint.
///
/// Exactly one result per endpoint is returned, in completion order. A check that panics is
/// reported as [ApiError::TaskFailed] for its endpoint and does not affect the others.
pub async fn poll_endpoints<T, F, Fut>(endpoints: &[String], check: F) -> Vec<EndpointResult<T>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    endpoints
        .iter()
        .map(|endpoint| (endpoint.clone(), tokio::spawn(check(endpoint.clone()))))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|(endpoint, handle)| async move {
            match handle.await {
                Ok(result) => EndpointResult::new(endpoint, result),
                Err(err) => {
                    EndpointResult::new(endpoint, Err(ApiError::TaskFailed(err.to_string())))
                }
            }
        })
        .collect::<FuturesUnordered<_>>()
        .collect()
        .await
}
