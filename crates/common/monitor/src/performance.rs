use std::sync::Arc;

use posmoni_api_types::{checkpoint::Checkpoint, validator::ValidatorBalance};
use posmoni_beacon_api::ConsensusApi;
use posmoni_storage::{record::ValidatorRecord, repository::Repository};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{config::BalancesStateRef, error::InvalidUint};

/// Parses a balance entry into `(index, balance)`.
pub fn parse_balance(entry: &ValidatorBalance) -> Result<(u64, u64), InvalidUint> {
    Ok((parse_uint(&entry.index)?, parse_uint(&entry.balance)?))
}

/// Decimal digits only. `u64::from_str` alone would also accept a leading `+`.
fn parse_uint(value: &str) -> Result<u64, InvalidUint> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(InvalidUint(value.to_string()));
    }
    value.parse().map_err(|_| InvalidUint(value.to_string()))
}

/// Updates validator records from the balances observed at each finalized checkpoint.
pub struct ValidatorPerformanceTracker {
    consensus: Arc<dyn ConsensusApi>,
    repository: Arc<dyn Repository>,
    validators: Vec<String>,
    balances_state: BalancesStateRef,
}

impl ValidatorPerformanceTracker {
    pub fn new(
        consensus: Arc<dyn ConsensusApi>,
        repository: Arc<dyn Repository>,
        validators: Vec<String>,
        balances_state: BalancesStateRef,
    ) -> Self {
        Self {
            consensus,
            repository,
            validators,
            balances_state,
        }
    }

    /// Processes checkpoints one at a time until the stream closes.
    pub async fn run(self, mut checkpoints: mpsc::UnboundedReceiver<Checkpoint>) {
        while let Some(checkpoint) = checkpoints.recv().await {
            self.process_checkpoint(&checkpoint).await;
        }
        info!("Checkpoint stream closed, validator tracking stopped");
    }

    /// Fetches the tracked balances once and applies them entry by entry.
    ///
    /// Returns how many records were written. A failed balance query skips the whole
    /// checkpoint, a bad entry or a failed write only skips that validator.
    pub async fn process_checkpoint(&self, checkpoint: &Checkpoint) -> usize {
        info!("Got checkpoint at epoch {}", checkpoint.epoch);

        let state_id = match self.balances_state.resolve(checkpoint) {
            Ok(state_id) => state_id,
            Err(err) => {
                error!("Skipping checkpoint with unusable state {}: {err}", checkpoint.state);
                return 0;
            }
        };

        let balances = match self
            .consensus
            .validator_balances(&state_id, &self.validators)
            .await
        {
            Ok(balances) => balances,
            Err(err) => {
                error!("Failed to fetch validator balances at {state_id}: {err}");
                return 0;
            }
        };

        balances
            .iter()
            .filter(|entry| self.apply_balance(entry))
            .count()
    }

    fn apply_balance(&self, entry: &ValidatorBalance) -> bool {
        debug!("Validator balance fetched: {entry:?}");

        let (idx, balance) = match parse_balance(entry) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!(
                    "Failed to parse balance entry (index: {}, balance: {}): {err}",
                    entry.index, entry.balance
                );
                return false;
            }
        };

        let stored = match self
            .repository
            .get_or_create(ValidatorRecord::new(idx, balance))
        {
            Ok(stored) => stored,
            Err(err) => {
                error!("Failed to load validator {idx}: {err}");
                return false;
            }
        };

        let updated = stored.observe_balance(balance);
        if updated.missed_attestation(&stored) {
            warn!(
                "Attestation has been missed by {idx}, count: {}",
                updated.missed_atts
            );
        }

        match self.repository.update(updated) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to update validator {idx}: {err}");
                false
            }
        }
    }
}
