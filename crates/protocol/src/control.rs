use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A control-plane request sent by a one-shot CLI invocation to the
/// long-running `serve` process. Deliberately loosely typed (`op` +
/// free-form `payload`) so adding an operation doesn't require touching
/// the wire type on both ends in lockstep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub op: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok(data: Value) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(message.into()) }
    }
}
