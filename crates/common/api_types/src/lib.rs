pub mod checkpoint;
pub mod endpoint;
pub mod error;
pub mod id;
pub mod json_rpc;
pub mod responses;
pub mod sync;
pub mod validator;
