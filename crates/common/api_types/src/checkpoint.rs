use serde::{Deserialize, Serialize};

/// Payload of a `finalized_checkpoint` event.
///
/// The identifiers are kept exactly as the node reported them, they are opaque to the monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: String,
    pub state: String,
    pub epoch: String,
}

impl Checkpoint {
    /// Decodes the `data` field of a server sent event.
    ///
    /// Returns `Ok(None)` for an empty payload, which nodes send as keep-alives.
    pub fn from_event_data(data: &str) -> Result<Option<Self>, serde_json::Error> {
        if data.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(data).map(Some)
    }
}
