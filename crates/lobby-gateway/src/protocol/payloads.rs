//! Payload definitions for server frames

use lobby_service::ServiceError;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
    pub connection_id: String,
}

impl HelloPayload {
    /// Default heartbeat interval (45 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    #[must_use]
    pub fn new(connection_id: impl Into<String>, heartbeat_interval: u64) -> Self {
        Self {
            heartbeat_interval,
            connection_id: connection_id.into(),
        }
    }
}

/// Error body of a failed call or a refused subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    pub code: String,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl CallError {
    /// Malformed parameters for a known method
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_PARAMS".to_string(),
            kind: "validation".to_string(),
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn unknown(what: &str, name: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            kind: "validation".to_string(),
            message: format!("Unknown {what} '{name}'"),
            retry_after_ms: None,
        }
    }
}

impl From<&ServiceError> for CallError {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.error_code().to_string(),
            kind: err.kind().as_str().to_string(),
            message: err.to_string(),
            retry_after_ms: err
                .retry_after()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}
