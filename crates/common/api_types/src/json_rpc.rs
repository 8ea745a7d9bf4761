use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub const JSON_RPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id: 1,
            jsonrpc: JSON_RPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Extracts the `result` field, an `error` object always takes precedence.
    pub fn into_result(self) -> Result<Value, ApiError> {
        if let Some(JsonRpcError { code, message }) = self.error {
            return Err(ApiError::Rpc { code, message });
        }
        self.result.ok_or(ApiError::MissingResult)
    }
}
