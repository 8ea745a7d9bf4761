use crate::error::ApiError;

/// Outcome of one operation against one endpoint.
///
/// Fan-out calls return one of these per endpoint so a failing node is reported as data instead
/// of aborting the whole batch.
#[derive(Debug)]
pub struct EndpointResult<T> {
    pub endpoint: String,
    pub result: Result<T, ApiError>,
}

impl<T> EndpointResult<T> {
    pub fn new(endpoint: impl Into<String>, result: Result<T, ApiError>) -> Self {
        Self {
            endpoint: endpoint.into(),
            result,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
