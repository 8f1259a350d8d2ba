//! Gateway frame format

use super::{CallError, HelloPayload, OpCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Gateway frame
///
/// Every text frame in either direction has this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Call id or subscription id, chosen by the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Method or publication name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn new(op: OpCode, id: Option<String>, t: Option<String>, d: Option<Value>) -> Self {
        Self { op, id, t, d }
    }

    // === Server Messages ===

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::new(
            OpCode::Hello,
            None,
            None,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, None, None, None)
    }

    /// Successful call result (op=3)
    #[must_use]
    pub fn result(call_id: impl Into<String>, result: Value) -> Self {
        Self::new(
            OpCode::Result,
            Some(call_id.into()),
            None,
            Some(json!({ "result": result })),
        )
    }

    /// Failed call result (op=3)
    #[must_use]
    pub fn call_error(call_id: impl Into<String>, error: &CallError) -> Self {
        Self::new(
            OpCode::Result,
            Some(call_id.into()),
            None,
            Some(json!({ "error": error })),
        )
    }

    /// Subscription snapshot (op=0)
    #[must_use]
    pub fn dispatch(sub_id: impl Into<String>, publication: &str, records: Value) -> Self {
        Self::new(
            OpCode::Dispatch,
            Some(sub_id.into()),
            Some(publication.to_string()),
            Some(records),
        )
    }

    /// Subscription established (op=6)
    #[must_use]
    pub fn ready(sub_id: impl Into<String>) -> Self {
        Self::new(OpCode::Ready, Some(sub_id.into()), None, None)
    }

    /// Subscription refused or ended (op=7)
    #[must_use]
    pub fn nosub(sub_id: impl Into<String>, error: Option<&CallError>) -> Self {
        Self::new(
            OpCode::NoSub,
            Some(sub_id.into()),
            None,
            error.map(|e| json!({ "error": e })),
        )
    }

    // === Parsing Client Messages ===

    /// Decode `d` into `T`; a missing `d` decodes from `null`
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.d.clone().unwrap_or(Value::Null))
    }

    /// Like [`Self::params`], but a missing or null `d` yields `T::default()`
    pub fn params_or_default<T: DeserializeOwned + Default>(&self) -> Result<T, serde_json::Error> {
        match &self.d {
            None | Some(Value::Null) => Ok(T::default()),
            Some(d) => serde_json::from_value(d.clone()),
        }
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewayMessage(op={}", self.op)?;
        if let Some(id) = &self.id {
            write!(f, ", id={id}")?;
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        write!(f, ")")
    }
}
