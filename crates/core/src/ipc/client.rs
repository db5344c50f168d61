use std::path::Path;
use std::time::Duration;

use bcd_protocol::{IpcRequest, IpcRequestPayload, IpcResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::ipc::path;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends one request over a fresh connection and reads exactly one
/// newline-terminated response line, then closes. Retrying on transient
/// failure is the caller's responsibility (the controller retries once
/// before falling back to a protocol-level path).
pub async fn send(workspace: &Path, request: IpcRequest, timeout: Duration) -> Result<IpcResponse> {
    tokio::time::timeout(timeout, send_inner(workspace, request)).await.map_err(|_| CoreError::IpcTimeout(timeout))?
}

async fn send_inner(workspace: &Path, request: IpcRequest) -> Result<IpcResponse> {
    let mut stream = connect(workspace).await?;
    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Err(CoreError::IpcUnavailable("connection closed before a response line arrived".into()));
    }
    let response: IpcResponse = serde_json::from_str(buf.trim_end()).map_err(CoreError::from)?;
    Ok(response)
}

/// `ping` with a short timeout; true iff a well-formed `ok` response
/// arrives.
pub async fn probe(workspace: &Path) -> bool {
    let request = IpcRequest { id: "probe".into(), payload: IpcRequestPayload::Ping };
    matches!(
        send(workspace, request, PROBE_TIMEOUT).await,
        Ok(IpcResponse { payload: bcd_protocol::IpcResponsePayload::Ok, .. })
    )
}

/// Returns the workspace's own socket path if it's live, otherwise scans
/// the data directory, reaping (unlinking) any socket file that fails
/// the liveness probe, and returns the first healthy one found.
pub async fn discover(workspace: Option<&Path>) -> Option<IpcPathBuf> {
    discover_in(&path::data_dir(), workspace).await
}

/// Same as [`discover`] but scans an explicit directory, so tests can
/// exercise the reaping behavior without touching the real data
/// directory.
pub async fn discover_in(dir: &Path, workspace: Option<&Path>) -> Option<IpcPathBuf> {
    if let Some(ws) = workspace {
        let candidate = path::socket_path(ws);
        if probe_path(&candidate).await {
            return Some(candidate);
        }
    }

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let candidate = entry.path();
        if !is_socket_like(&candidate) {
            continue;
        }
        if probe_path(&candidate).await {
            return Some(candidate);
        }
        debug!(target = "bcd.ipc", path = %candidate.display(), "reaping stale socket");
        let _ = tokio::fs::remove_file(&candidate).await;
    }
    None
}

#[cfg(unix)]
pub type IpcPathBuf = std::path::PathBuf;
#[cfg(windows)]
pub type IpcPathBuf = String;

#[cfg(unix)]
fn is_socket_like(p: &std::path::Path) -> bool {
    p.extension().is_some_and(|e| e == "sock")
}

#[cfg(windows)]
fn is_socket_like(_p: &std::path::Path) -> bool {
    false
}

#[cfg(unix)]
async fn probe_path(path: &std::path::Path) -> bool {
    let request = IpcRequest { id: "probe".into(), payload: IpcRequestPayload::Ping };
    tokio::time::timeout(PROBE_TIMEOUT, send_over(path, request)).await.ok().flatten().is_some_and(
        |r| matches!(r.payload, bcd_protocol::IpcResponsePayload::Ok),
    )
}

#[cfg(windows)]
async fn probe_path(_path: &str) -> bool {
    false
}

#[cfg(unix)]
async fn connect(workspace: &Path) -> Result<tokio::net::UnixStream> {
    let socket_path = path::socket_path(workspace);
    tokio::net::UnixStream::connect(&socket_path).await.map_err(|e| CoreError::IpcUnavailable(e.to_string()))
}

#[cfg(unix)]
async fn send_over(path: &std::path::Path, request: IpcRequest) -> Option<IpcResponse> {
    let mut stream = tokio::net::UnixStream::connect(path).await.ok()?;
    let mut line = serde_json::to_string(&request).ok()?;
    line.push('\n');
    stream.write_all(line.as_bytes()).await.ok()?;
    stream.flush().await.ok()?;
    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await.ok()?;
    if n == 0 {
        return None;
    }
    serde_json::from_str(buf.trim_end()).ok()
}

#[cfg(windows)]
async fn connect(_workspace: &Path) -> Result<tokio::net::windows::named_pipe::NamedPipeClient> {
    use tokio::net::windows::named_pipe::ClientOptions;
    let pipe_name = path::socket_path(_workspace);
    ClientOptions::new().open(&pipe_name).map_err(|e| CoreError::IpcUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn probe_returns_false_when_nothing_listens() {
        let workspace = PathBuf::from("/tmp/browser-coordinator-test-workspace-does-not-exist");
        assert!(!probe(&workspace).await);
    }
}
