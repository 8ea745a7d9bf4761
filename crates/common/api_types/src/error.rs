use std::time::Duration;

use reqwest::{Method, StatusCode};
use thiserror::Error;
use url::Url;

/// Connection level failure of a single logical request, after retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{method} {url} failed after {attempts} attempt(s) in {elapsed:?}: {source}")]
    Exhausted {
        method: Method,
        url: Url,
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request body for {url} can not be replayed across retries")]
    UncloneableRequest { url: Url },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Request to {url} failed with status code: {status_code}, body: {body}")]
    RequestFailed {
        url: Url,
        status_code: StatusCode,
        body: String,
    },

    #[error("Endpoint reported unhealthy status code: {status_code}")]
    Unhealthy { status_code: StatusCode },

    #[error("Failed to build request: {0}")]
    BuildRequest(reqwest::Error),

    #[error("Failed to read response body: {0}")]
    ReadBody(reqwest::Error),

    #[error("Failed to decode JSON response: {0}")]
    JsonDecode(#[from] serde_json::Error),

    #[error("JSON-RPC error {code} ({message})")]
    Rpc { code: i64, message: String },

    #[error("JSON-RPC response carried neither a result nor an error")]
    MissingResult,

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("No endpoints configured")]
    NoEndpoints,

    #[error("Endpoint task failed: {0}")]
    TaskFailed(String),
}
