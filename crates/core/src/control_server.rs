//! The control-plane socket a running `serve` process listens on so
//! one-shot CLI invocations (`status`, `navigate`, `launch`, ...) can
//! reach the already-running coordinator instead of starting their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bcd_protocol::{ControlRequest, ControlResponse};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::controller::{Controller, FetchRequest, ScreenshotOptions};
use crate::ipc::path::control_socket_path;
use crate::types::{BrowserKind, LaunchOptions};

#[cfg(unix)]
pub async fn spawn(workspace: Option<PathBuf>, controller: Arc<Controller>) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let path = control_socket_path(workspace.as_deref());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let _ = tokio::fs::remove_file(&path).await;
    let listener = tokio::net::UnixListener::bind(&path)?;
    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let controller = Arc::clone(&controller);
                    tokio::spawn(async move {
                        if let Err(err) = serve_one(stream, controller).await {
                            warn!(target = "bcd.control", %err, "control connection error");
                        }
                    });
                }
                Err(err) => {
                    warn!(target = "bcd.control", %err, "control accept failed");
                    return;
                }
            }
        }
    }))
}

#[cfg(unix)]
async fn serve_one(stream: tokio::net::UnixStream, controller: Arc<Controller>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = String::new();
    if reader.read_line(&mut buf).await? == 0 {
        return Ok(());
    }
    let response = match serde_json::from_str::<ControlRequest>(buf.trim_end()) {
        Ok(request) => handle(request, &controller).await,
        Err(err) => ControlResponse::err(format!("malformed control request: {err}")),
    };
    let mut line = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(unix)]
async fn handle(request: ControlRequest, controller: &Controller) -> ControlResponse {
    let result = dispatch(request, controller).await;
    match result {
        Ok(value) => ControlResponse::ok(value),
        Err(err) => ControlResponse::err(err.to_string()),
    }
}

#[cfg(unix)]
async fn dispatch(request: ControlRequest, controller: &Controller) -> crate::error::Result<Value> {
    match request.op.as_str() {
        "status" => Ok(json!(controller.status().await)),
        "list_browsers" => Ok(json!(controller.list_browsers().await)),
        "launch" => {
            let opts = parse_launch_opts(&request.payload);
            let port = controller.launch_browser(opts).await?;
            Ok(json!({ "port": port }))
        }
        "stop" => {
            controller.stop_browser().await?;
            Ok(Value::Null)
        }
        "restart" => {
            let opts = parse_launch_opts(&request.payload);
            let port = controller.restart_browser(opts).await?;
            Ok(json!({ "port": port }))
        }
        "navigate" => {
            let url = request.payload.get("url").and_then(Value::as_str).unwrap_or_default();
            controller.navigate(url).await?;
            Ok(Value::Null)
        }
        "select_element" => {
            let timeout_ms = request.payload.get("timeout_ms").and_then(Value::as_u64).unwrap_or(30_000);
            let element = controller.select_element(Duration::from_millis(timeout_ms)).await?;
            Ok(element)
        }
        "dom" => {
            let selector = request.payload.get("selector").and_then(Value::as_str);
            let depth = request.payload.get("depth").and_then(Value::as_u64).map(|d| d as u32);
            let html = controller.get_dom(selector, depth).await?;
            Ok(json!({ "html": html }))
        }
        "screenshot" => {
            let opts = parse_screenshot_opts(&request.payload);
            let result = controller.screenshot(opts).await?;
            Ok(json!({ "path": result.path, "base64": result.base64 }))
        }
        "fetch" => {
            let fetch = parse_fetch_request(&request.payload)?;
            let body = controller.fetch(fetch).await?;
            Ok(json!({ "body": body }))
        }
        other => Err(crate::error::CoreError::InvalidArgument(format!("unknown control operation: {other}"))),
    }
}

#[cfg(unix)]
fn parse_launch_opts(payload: &Value) -> LaunchOptions {
    let kind = payload.get("kind").and_then(Value::as_str).and_then(parse_kind);
    let headless = payload.get("headless").and_then(Value::as_bool);
    LaunchOptions { kind, headless }
}

#[cfg(unix)]
fn parse_kind(s: &str) -> Option<BrowserKind> {
    match s.to_ascii_lowercase().as_str() {
        "chrome" => Some(BrowserKind::Chrome),
        "edge" => Some(BrowserKind::Edge),
        "chromium" => Some(BrowserKind::Chromium),
        "brave" => Some(BrowserKind::Brave),
        "firefox" => Some(BrowserKind::Firefox),
        _ => None,
    }
}

#[cfg(unix)]
fn parse_screenshot_opts(payload: &Value) -> ScreenshotOptions {
    ScreenshotOptions {
        selector: payload.get("selector").and_then(Value::as_str).map(str::to_string),
        clip: None,
        full_page: payload.get("full_page").and_then(Value::as_bool).unwrap_or(false),
        format: payload.get("format").and_then(Value::as_str).map(str::to_string),
        output_dir: payload.get("output_dir").and_then(Value::as_str).map(PathBuf::from),
    }
}

#[cfg(unix)]
fn parse_fetch_request(payload: &Value) -> crate::error::Result<FetchRequest> {
    let url = payload
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| crate::error::CoreError::InvalidArgument("fetch requires a url".into()))?
        .to_string();
    Ok(FetchRequest {
        url,
        method: payload.get("method").and_then(Value::as_str).map(str::to_string),
        headers: payload.get("headers").cloned(),
        body: payload.get("body").and_then(Value::as_str).map(str::to_string),
        timeout: payload.get("timeout_ms").and_then(Value::as_u64).map(Duration::from_millis),
    })
}

/// One-shot client used by CLI subcommands to reach a running `serve`
/// process.
pub async fn call(workspace: Option<&Path>, op: &str, payload: Value, timeout: Duration) -> crate::error::Result<ControlResponse> {
    tokio::time::timeout(timeout, call_inner(workspace, op, payload)).await.map_err(|_| crate::error::CoreError::IpcTimeout(timeout))?
}

#[cfg(unix)]
async fn call_inner(workspace: Option<&Path>, op: &str, payload: Value) -> crate::error::Result<ControlResponse> {
    let path = control_socket_path(workspace);
    let mut stream = tokio::net::UnixStream::connect(&path)
        .await
        .map_err(|e| crate::error::CoreError::IpcUnavailable(format!("coordinator not reachable at {}: {e}", path.display())))?;
    let request = ControlRequest { op: op.to_string(), payload };
    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Err(crate::error::CoreError::IpcUnavailable("connection closed before a response line arrived".into()));
    }
    Ok(serde_json::from_str(buf.trim_end())?)
}

#[cfg(windows)]
async fn call_inner(_workspace: Option<&Path>, _op: &str, _payload: Value) -> crate::error::Result<ControlResponse> {
    Err(crate::error::CoreError::IpcUnavailable("control socket transport is POSIX-only in this build".into()))
}

#[cfg(windows)]
pub async fn spawn(_workspace: Option<PathBuf>, _controller: Arc<Controller>) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}
