pub mod config;
pub mod error;
pub mod monitor;
pub mod performance;
pub mod sync_tracker;
