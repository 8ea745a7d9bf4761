use std::{collections::HashSet, fmt, fs, path::Path, str::FromStr, time::Duration};

use posmoni_api_types::{checkpoint::Checkpoint, error::ApiError, id::StateId};
use posmoni_transport::http_client::RetryingTransport;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(60);

/// Which beacon state validator balances are read from when a checkpoint arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BalancesStateRef {
    /// Always query the same state, `head` unless configured otherwise.
    Fixed(StateId),
    /// Query the state root carried by the checkpoint itself.
    Checkpoint,
}

impl Default for BalancesStateRef {
    fn default() -> Self {
        BalancesStateRef::Fixed(StateId::Head)
    }
}

impl BalancesStateRef {
    pub fn resolve(&self, checkpoint: &Checkpoint) -> Result<StateId, String> {
        match self {
            BalancesStateRef::Fixed(state_id) => Ok(state_id.clone()),
            BalancesStateRef::Checkpoint => checkpoint.state.parse(),
        }
    }
}

impl FromStr for BalancesStateRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("checkpoint") {
            return Ok(BalancesStateRef::Checkpoint);
        }
        s.parse().map(BalancesStateRef::Fixed)
    }
}

impl TryFrom<String> for BalancesStateRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BalancesStateRef> for String {
    fn from(value: BalancesStateRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BalancesStateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalancesStateRef::Fixed(state_id) => write!(f, "{state_id}"),
            BalancesStateRef::Checkpoint => write!(f, "checkpoint"),
        }
    }
}

/// What the configuration is about to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Monitor,
    TrackSync,
}

/// Validator indices show up both as JSON strings and as plain numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidatorIndex {
    Text(String),
    Number(u64),
}

impl From<ValidatorIndex> for String {
    fn from(value: ValidatorIndex) -> Self {
        match value {
            ValidatorIndex::Text(text) => text,
            ValidatorIndex::Number(number) => number.to_string(),
        }
    }
}

fn validator_indices<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::<ValidatorIndex>::deserialize(deserializer)?
        .into_iter()
        .map(String::from)
        .collect())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Monitor configuration, built once and handed to every constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub consensus: Vec<Url>,
    pub execution: Vec<Url>,
    #[serde(deserialize_with = "validator_indices")]
    pub validators: Vec<String>,
    /// Endpoints answering with a JSON array of validator indices to track as well.
    pub validators_external_http: Vec<Url>,
    pub balances_state: BalancesStateRef,
    /// Seconds a single logical request may spend retrying connection failures.
    #[serde(with = "duration_secs")]
    pub retry_budget: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            consensus: vec![],
            execution: vec![],
            validators: vec![],
            validators_external_http: vec![],
            balances_state: BalancesStateRef::default(),
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

fn endpoint_strings(urls: &[Url]) -> Vec<String> {
    urls.iter()
        .map(|url| url.as_str().trim_end_matches('/').to_string())
        .collect()
}

fn check_endpoint(url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        "http" | "https" => Err(ConfigError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: "missing host".to_string(),
        }),
        scheme => Err(ConfigError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}

impl MonitorConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Consensus endpoints without trailing slashes, ready to have API paths appended.
    pub fn consensus_endpoints(&self) -> Vec<String> {
        endpoint_strings(&self.consensus)
    }

    pub fn execution_endpoints(&self) -> Vec<String> {
        endpoint_strings(&self.execution)
    }

    pub fn validate(&self, subsystem: Subsystem) -> Result<(), ConfigError> {
        self.consensus
            .iter()
            .chain(&self.execution)
            .chain(&self.validators_external_http)
            .try_for_each(check_endpoint)?;

        if self.consensus.is_empty() {
            return Err(ConfigError::NoConsensusEndpoints);
        }

        match subsystem {
            Subsystem::Monitor if self.validators.is_empty() => Err(ConfigError::NoValidators),
            Subsystem::TrackSync if self.execution.is_empty() => {
                Err(ConfigError::NoExecutionEndpoints)
            }
            _ => Ok(()),
        }
    }

    /// Adds the validators listed by `validators_external_http` to the configured ones.
    ///
    /// Endpoints are queried in order and the merged list keeps the first occurrence of every
    /// index. An endpoint that fails is logged and contributes nothing.
    pub async fn merge_external_validators(mut self, transport: &RetryingTransport) -> Self {
        if self.validators_external_http.is_empty() {
            return self;
        }

        let mut external = vec![];
        for url in &self.validators_external_http {
            match fetch_validators(transport, url.clone(), self.retry_budget).await {
                Ok(validators) => {
                    info!("Retrieved {} validators from {url}", validators.len());
                    external.extend(validators);
                }
                Err(err) => warn!("Unable to retrieve validators from {url}: {err}"),
            }
        }

        self.validators = merge_validators(self.validators, external);
        self
    }
}

async fn fetch_validators(
    transport: &RetryingTransport,
    url: Url,
    retry_budget: Duration,
) -> Result<Vec<String>, ApiError> {
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

    let validators: Vec<ValidatorIndex> = serde_json::from_str(&body)?;
    Ok(validators.into_iter().map(String::from).collect())
}

pub fn merge_validators(
    configured: Vec<String>,
    external: impl IntoIterator<Item = String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    configured
        .into_iter()
        .chain(external)
        .filter(|validator| seen.insert(validator.clone()))
        .collect()
}
