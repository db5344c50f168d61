use bcd_protocol::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no compatible browser found on this system")]
    NoBrowser,

    #[error("failed to spawn browser process: {0}")]
    SpawnFailed(String),

    #[error("browser did not report readiness within {secs}s")]
    ReadinessTimeout { secs: u64 },

    #[error("browser process exited before reporting readiness")]
    ProcessExited,

    #[error("failed to bind proxy listener: {0}")]
    ProxyBindFailed(#[source] std::io::Error),

    #[error("proxy could not reach backend on port {port}: {source}")]
    BackendConnect { port: u16, #[source] source: std::io::Error },

    #[error("IPC endpoint unavailable: {0}")]
    IpcUnavailable(String),

    #[error("IPC request timed out after {0:?}")]
    IpcTimeout(std::time::Duration),

    #[error("in-browser evaluation failed: {0}")]
    Evaluation(String),

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fetch landed on unexpected origin: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl CoreError {
    /// Classifies this error for the structured output envelope. Mirrors
    /// the error-kind taxonomy in the design notes: every variant maps
    /// to exactly one externally-stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NoBrowser => ErrorCode::NoBrowserFound,
            CoreError::SpawnFailed(_) => ErrorCode::SpawnFailed,
            CoreError::ReadinessTimeout { .. } | CoreError::ProcessExited => ErrorCode::ReadinessTimeout,
            CoreError::ProxyBindFailed(_) => ErrorCode::ProxyBindFailed,
            CoreError::BackendConnect { .. } => ErrorCode::BackendConnectFailed,
            CoreError::IpcUnavailable(_) | CoreError::IpcTimeout(_) => ErrorCode::IpcUnavailable,
            CoreError::Evaluation(_) | CoreError::WebSocket(_) => ErrorCode::EvaluationFailed,
            CoreError::ElementNotFound { .. } => ErrorCode::ElementNotFound,
            CoreError::Timeout(_) => ErrorCode::Timeout,
            CoreError::OriginMismatch { .. } => ErrorCode::OriginMismatch,
            CoreError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            CoreError::Io(_) | CoreError::Json(_) | CoreError::Http(_) => ErrorCode::Internal,
        }
    }
}
