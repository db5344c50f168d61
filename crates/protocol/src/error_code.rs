use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, machine-readable classification of a control-operation
/// failure, carried in the CLI's JSON result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoBrowserFound,
    SpawnFailed,
    ReadinessTimeout,
    ProxyBindFailed,
    BackendConnectFailed,
    IpcUnavailable,
    EvaluationFailed,
    OriginMismatch,
    ElementNotFound,
    Timeout,
    InvalidArgument,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self).ok().and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_else(|| "INTERNAL".to_string());
        f.write_str(&s)
    }
}
