pub mod http_client;
pub mod poller;
pub mod retry;
