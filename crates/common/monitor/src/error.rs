use std::path::PathBuf;

use posmoni_api_types::error::ApiError;
use posmoni_storage::errors::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No consensus endpoints configured")]
    NoConsensusEndpoints,

    #[error("No execution endpoints configured")]
    NoExecutionEndpoints,

    #[error("No validators configured")]
    NoValidators,

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Failed to read config file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to migrate validator repository: {0}")]
    Migration(#[source] StoreError),

    #[error("Failed to set up beacon endpoints: {0}")]
    Endpoints(#[from] ApiError),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid unsigned integer {0:?}")]
pub struct InvalidUint(pub String);
