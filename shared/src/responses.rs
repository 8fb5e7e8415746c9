use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON envelope returned by every notification-service endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Error envelope. `data` may still carry context, e.g. the number of
    /// recipients a failed dispatch was meant for.
    pub fn err_with(error_msg: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error_msg.into()),
        }
    }

    pub fn err(error_msg: impl Into<String>) -> Self {
        Self::err_with(error_msg, None)
    }
}

/// Response for the `/headpat` liveness endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HeadpatResponse {
    pub message: &'static str,
}
