use serde::{Deserialize, Serialize};

/// One entry of `/eth/v1/beacon/states/{state_id}/validator_balances`.
///
/// Both fields are left as the decimal strings the node returned, parsing happens per entry so a
/// single bad entry can be skipped without failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorBalance {
    pub index: String,
    pub balance: String,
}
