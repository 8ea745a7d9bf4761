use alloy_primitives::U64;
use serde::{Deserialize, Serialize};

/// Anything that can tell whether a node is still catching up with the network head.
pub trait SyncState {
    fn is_syncing(&self) -> bool;
}

/// Response data of `GET /eth/v1/node/syncing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncStatus {
    #[serde(with = "serde_utils::quoted_u64")]
    pub head_slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub sync_distance: u64,
    pub is_syncing: bool,
    #[serde(default)]
    pub is_optimistic: bool,
    #[serde(default)]
    pub el_offline: bool,
}

impl SyncState for SyncStatus {
    fn is_syncing(&self) -> bool {
        self.is_syncing
    }
}

/// Progress object returned by `eth_syncing` while an execution node is syncing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub starting_block: U64,
    pub current_block: U64,
    pub highest_block: U64,
}

/// Result of `eth_syncing`: `false` once synced, a progress object otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EthSyncing {
    Progress(SyncProgress),
    Flag(bool),
}

impl SyncState for EthSyncing {
    fn is_syncing(&self) -> bool {
        match self {
            EthSyncing::Progress(_) => true,
            EthSyncing::Flag(syncing) => *syncing,
        }
    }
}
