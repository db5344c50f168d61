//! A minimal CDP JSON client: just enough correlation to drive the
//! handful of `Page.*` / `Runtime.*` / `Target.*` calls the in-browser
//! operation runner needs. Not a general protocol binding.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;

use crate::error::{CoreError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fetches the list of inspectable targets from the debugging HTTP
/// endpoint and returns the first page target's WebSocket URL.
pub async fn page_target_ws_url(backend_port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{backend_port}/json");
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let targets: Vec<Value> = client.get(&url).send().await?.json().await?;
    targets
        .into_iter()
        .find(|t| t.get("type").and_then(Value::as_str) == Some("page"))
        .and_then(|t| t.get("webSocketDebuggerUrl").and_then(Value::as_str).map(str::to_owned))
        .ok_or_else(|| CoreError::Evaluation("no page target exposed by the browser".into()))
}

/// Opens a new background tab via the debugging HTTP endpoint and
/// returns its target id and WebSocket debugger URL.
pub async fn create_background_target(backend_port: u16) -> Result<(String, String)> {
    let url = format!("http://127.0.0.1:{backend_port}/json/new?about:blank");
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let target: Value = client.put(&url).send().await?.json().await?;
    let id = target.get("id").and_then(Value::as_str).ok_or_else(|| CoreError::Evaluation("target creation response had no id field".into()))?.to_string();
    let ws_url = target
        .get("webSocketDebuggerUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::Evaluation("target creation response had no webSocketDebuggerUrl field".into()))?
        .to_string();
    Ok((id, ws_url))
}

/// Closes a target by id, best-effort: the caller should not treat a
/// failure here as fatal to whatever operation it was cleaning up after.
pub async fn close_target(backend_port: u16, target_id: &str) -> Result<()> {
    let url = format!("http://127.0.0.1:{backend_port}/json/close/{target_id}");
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    client.get(&url).send().await?;
    Ok(())
}

pub struct CdpSession {
    write: Mutex<futures_util::stream::SplitSink<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, Message>>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    events: broadcast::Sender<Value>,
    next_id: AtomicU64,
    _reader: tokio::task::JoinHandle<()>,
}

impl CdpSession {
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
        let (write, mut read) = stream.split();
        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let reader_pending = Arc::clone(&pending);
        let reader_events = events.clone();
        let reader = tokio::spawn(async move {
            while let Some(Ok(msg)) = read.next().await {
                if let Message::Text(text) = msg {
                    if let Ok(value) = serde_json::from_str::<Value>(&text) {
                        if let Some(id) = value.get("id").and_then(Value::as_u64) {
                            if let Some(tx) = reader_pending.lock().await.remove(&id) {
                                let _ = tx.send(value);
                            }
                        } else {
                            let _ = reader_events.send(value);
                        }
                    }
                }
            }
        });
        Ok(Self { write: Mutex::new(write), pending, events, next_id: AtomicU64::new(1), _reader: reader })
    }

    pub async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params }).to_string();
        self.write.lock().await.send(Message::Text(frame.into())).await?;

        let response = tokio::time::timeout(timeout, rx).await.map_err(|_| CoreError::Timeout(timeout))?.map_err(|_| CoreError::Evaluation("session closed before response arrived".into()))?;

        if let Some(error) = response.get("error") {
            return Err(CoreError::Evaluation(error.to_string()));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Evaluates a JS expression and returns its JSON-serializable
    /// result via `awaitPromise`.
    pub async fn evaluate(&self, expression: &str, timeout: Duration) -> Result<Value> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true, "awaitPromise": true }),
                timeout,
            )
            .await?;
        if let Some(exception) = result.get("exceptionDetails") {
            return Err(CoreError::Evaluation(exception.to_string()));
        }
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.call("Page.navigate", json!({ "url": url }), timeout).await?;
        Ok(())
    }

    /// Navigates and waits for a top-frame `Page.frameNavigated` event,
    /// bounded by `timeout`. Requires `Page.enable` to have been called
    /// on this session so frame events are actually emitted.
    pub async fn navigate_and_wait_for_load(&self, url: &str, timeout: Duration) -> Result<()> {
        let mut events = self.events.subscribe();
        self.call("Page.navigate", json!({ "url": url }), timeout).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(CoreError::Timeout(timeout));
            }
            let event = match tokio::time::timeout(remaining, events.recv()).await {
                Ok(Ok(event)) => event,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return Err(CoreError::Evaluation("session closed while waiting for navigation".into())),
                Err(_) => return Err(CoreError::Timeout(timeout)),
            };
            if event.get("method").and_then(Value::as_str) != Some("Page.frameNavigated") {
                continue;
            }
            let is_top_frame = event.pointer("/params/frame/parentId").is_none();
            if is_top_frame {
                return Ok(());
            }
        }
    }

    pub async fn capture_screenshot(&self, format: &str, clip: Option<Value>, capture_beyond_viewport: bool, timeout: Duration) -> Result<String> {
        let mut params = json!({ "format": format });
        if let Some(clip) = clip {
            params["clip"] = clip;
        }
        if capture_beyond_viewport {
            params["captureBeyondViewport"] = json!(true);
        }
        let result = self.call("Page.captureScreenshot", params, timeout).await?;
        result.get("data").and_then(Value::as_str).map(str::to_owned).ok_or_else(|| CoreError::Evaluation("screenshot response had no data field".into()))
    }

    /// Full scrollable document size, used to build a full-page clip when
    /// no explicit clip/selector narrows the capture.
    pub async fn content_size(&self, timeout: Duration) -> Result<(f64, f64)> {
        let result = self.call("Page.getLayoutMetrics", json!({}), timeout).await?;
        let size = result.pointer("/cssContentSize").or_else(|| result.pointer("/contentSize")).ok_or_else(|| CoreError::Evaluation("layout metrics response had no content size".into()))?;
        let width = size.get("width").and_then(Value::as_f64).ok_or_else(|| CoreError::Evaluation("content size missing width".into()))?;
        let height = size.get("height").and_then(Value::as_f64).ok_or_else(|| CoreError::Evaluation("content size missing height".into()))?;
        Ok((width, height))
    }
}
