use std::{fmt, time::Duration};

use posmoni_api_types::error::{ApiError, TransportError};
use reqwest::{
    Client, Request, RequestBuilder, Response, Url,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::Serialize;
use tracing::error;

use crate::retry::{BackoffPolicy, retry_with_backoff};

pub const JSON_CONTENT_TYPE: &str = "application/json";

enum SendFailure {
    Connection(reqwest::Error),
    Uncloneable,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::Connection(err) => write!(f, "{err}"),
            SendFailure::Uncloneable => write!(f, "request body can not be cloned"),
        }
    }
}

/// HTTP client whose requests are retried with exponential backoff on connection failures.
///
/// A response that arrives is never retried, whatever its status code. Non-2xx statuses are
/// logged and handed back to the caller, which has to inspect them.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    client: Client,
    policy: BackoffPolicy,
}

impl RetryingTransport {
    pub fn new(request_timeout: Duration, policy: BackoffPolicy) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::BuildRequest)?;

        Ok(Self { client, policy })
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post_json<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> RequestBuilder {
        self.client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .json(body)
    }

    /// Sends `request`, retrying connection level failures until `retry_budget` is spent.
    pub async fn send(
        &self,
        request: Request,
        retry_budget: Duration,
    ) -> Result<Response, TransportError> {
        let method = request.method().clone();
        let url = request.url().clone();

        let result = retry_with_backoff(&self.policy, retry_budget, || {
            let client = self.client.clone();
            let attempt = request.try_clone();
            async move {
                match attempt {
                    Some(attempt) => client
                        .execute(attempt)
                        .await
                        .map_err(|err| backoff::Error::transient(SendFailure::Connection(err))),
                    None => Err(backoff::Error::permanent(SendFailure::Uncloneable)),
                }
            }
        })
        .await;

        match result {
            Ok(response) => {
                if !response.status().is_success() {
                    error!("{method} {url} returned bad status code: {}", response.status());
                }
                Ok(response)
            }
            Err(exhausted) => match exhausted.last_error {
                SendFailure::Connection(source) => {
                    error!(
                        "{method} {url} failed after {} attempt(s): {source}",
                        exhausted.attempts
                    );
                    Err(TransportError::Exhausted {
                        method,
                        url,
                        attempts: exhausted.attempts,
                        elapsed: exhausted.elapsed,
                        source,
                    })
                }
                SendFailure::Uncloneable => Err(TransportError::UncloneableRequest { url }),
            },
        }
    }

    /// Builds `request` and sends it through [RetryingTransport::send].
    pub async fn execute(
        &self,
        request: RequestBuilder,
        retry_budget: Duration,
    ) -> Result<Response, ApiError> {
        let request = request.build().map_err(ApiError::BuildRequest)?;
        Ok(self.send(request, retry_budget).await?)
    }
}
