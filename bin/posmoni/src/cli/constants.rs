use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = ".posmoni";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30";
pub const DEFAULT_SYNC_INTERVAL: &str = "60";
pub const DEFAULT_VERBOSITY: &str = "3";
pub const TRACK_SYNC_RETRY_BUDGET: Duration = Duration::from_secs(1);
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(1);
