use serde::{Deserialize, Serialize};

/// A DataResponse data struct that can be used to wrap data type
/// used for beacon api responses
///
/// # Example
/// {
///  "data": json!(T)
/// }
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}
