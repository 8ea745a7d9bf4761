use std::{fmt, str::FromStr};

use alloy_primitives::{B256, hex};
use serde::{Deserialize, Serialize};

/// [StateId] identifies the beacon state a query is evaluated against (`state_id`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateId {
    Finalized,
    Genesis,
    #[default]
    Head,
    Justified,
    Slot(u64),
    /// expected to be a 0x-prefixed hex string.
    Root(B256),
}

impl FromStr for StateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "finalized" => Ok(StateId::Finalized),
            "genesis" => Ok(StateId::Genesis),
            "head" => Ok(StateId::Head),
            "justified" => Ok(StateId::Justified),
            _ => {
                if s.starts_with("0x") {
                    B256::from_str(s)
                        .map(StateId::Root)
                        .map_err(|_| format!("Invalid hex root: {s}"))
                } else if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                    s.parse::<u64>()
                        .map(StateId::Slot)
                        .map_err(|_| format!("Invalid slot number: {s}"))
                } else {
                    Err(format!("Invalid state ID: {s}"))
                }
            }
        }
    }
}

impl Serialize for StateId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StateId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StateId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Finalized => write!(f, "finalized"),
            StateId::Genesis => write!(f, "genesis"),
            StateId::Head => write!(f, "head"),
            StateId::Justified => write!(f, "justified"),
            StateId::Slot(slot) => write!(f, "{slot}"),
            StateId::Root(root) => write!(f, "0x{}", hex::encode(root)),
        }
    }
}
