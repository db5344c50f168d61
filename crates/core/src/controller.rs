use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bcd_protocol::{EditorState, IpcRequest, IpcRequestPayload, IpcResponsePayload, RendezvousRecord};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cdp::{CdpSession, close_target, create_background_target, page_target_ws_url};
use crate::config::CoordinatorConfig;
use crate::detector;
use crate::error::{CoreError, Result};
use crate::launcher::{self, BrowserInstance};
use crate::proxy::Proxy;
use crate::rendezvous;
use crate::types::{BrowserKind, LaunchOptions};

struct Shared {
    instance: Mutex<Option<BrowserInstance>>,
    workspace: Option<PathBuf>,
    config: CoordinatorConfig,
}

/// Wires the detector, launcher, proxy, rendezvous and IPC client
/// together and exposes the control operations a host calls.
pub struct Controller {
    proxy: Proxy,
    shared: Arc<Shared>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BrowserSummary {
    pub kind: String,
    pub name: String,
    pub source: &'static str,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub engine: Option<String>,
    pub internal_port: Option<u16>,
    pub proxy_port: u16,
    pub editor_live: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ScreenshotOptions {
    pub selector: Option<String>,
    pub clip: Option<(f64, f64, f64, f64)>,
    pub full_page: bool,
    pub format: Option<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScreenshotResult {
    pub path: PathBuf,
    pub base64: String,
}

#[derive(Debug, Default, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Option<String>,
    pub headers: Option<Value>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl Controller {
    pub async fn start(workspace: Option<PathBuf>, config: CoordinatorConfig) -> Result<Self> {
        let proxy = Proxy::listen(config.proxy_port).await?;
        let shared = Arc::new(Shared { instance: Mutex::new(None), workspace, config });

        let cb_shared = Arc::clone(&shared);
        proxy
            .on_lazy_launch(move || {
                let shared = Arc::clone(&cb_shared);
                async move { lazy_launch(&shared).await.map_err(|e| e.to_string()) }
            })
            .await;

        if let Some(ws) = shared.workspace.clone() {
            if let Some(state) = fetch_editor_state(&ws).await {
                if let Some(port) = state.cdp_port {
                    proxy.set_backend(port).await;
                }
            }
        }

        rendezvous::write(RendezvousRecord::new(proxy.port(), std::process::id() as i32));
        info!(target = "bcd.controller", port = proxy.port(), "coordinator started");

        Ok(Self { proxy, shared })
    }

    pub fn proxy_port(&self) -> u16 {
        self.proxy.port()
    }

    pub async fn list_browsers(&self) -> Vec<BrowserSummary> {
        let mut out = Vec::new();
        if let Some(ws) = &self.shared.workspace {
            if fetch_editor_state(ws).await.is_some() {
                out.push(BrowserSummary { kind: "editor".into(), name: "Editor-hosted browser".into(), source: "editor" });
            }
        }
        for b in detector::enumerate() {
            out.push(BrowserSummary { kind: b.kind.to_string(), name: b.name.to_string(), source: "detected" });
        }
        out
    }

    pub async fn status(&self) -> StatusReport {
        let editor_live = match &self.shared.workspace {
            Some(ws) => crate::ipc::probe(ws).await,
            None => false,
        };
        let instance = self.shared.instance.lock().await;
        StatusReport {
            running: instance.is_some(),
            engine: instance.as_ref().map(|i| format!("{:?}", i.engine).to_lowercase()),
            internal_port: instance.as_ref().map(|i| i.port),
            proxy_port: self.proxy.port(),
            editor_live,
        }
    }

    pub async fn launch_browser(&self, opts: LaunchOptions) -> Result<u16> {
        if opts.kind.is_none() {
            if let Some(ws) = &self.shared.workspace {
                if fetch_editor_state(ws).await.is_some() {
                    return Err(CoreError::InvalidArgument("editor already provides a browser; pass an explicit kind to launch a separate one".into()));
                }
            }
        }
        self.stop_browser().await?;
        let port = lazy_launch_with_opts(&self.shared, opts).await?;
        self.proxy.set_backend(port).await;
        self.proxy.close_connections().await;
        Ok(port)
    }

    pub async fn stop_browser(&self) -> Result<()> {
        let mut slot = self.shared.instance.lock().await;
        if let Some(mut instance) = slot.take() {
            tokio::task::spawn_blocking(move || launcher::stop(&mut instance)).await.map_err(|e| CoreError::Evaluation(e.to_string()))??;
        }
        Ok(())
    }

    pub async fn restart_browser(&self, opts: LaunchOptions) -> Result<u16> {
        self.launch_browser(opts).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        if let Some(ws) = &self.shared.workspace {
            if let Some(response) = crate::ipc::send(ws, navigate_request(url), self.shared.config.ipc_timeout).await.ok() {
                if matches!(response.payload, IpcResponsePayload::Ok) {
                    return Ok(());
                }
            }
        }
        let session = self.open_session().await?;
        session.navigate(url, self.shared.config.ipc_timeout).await
    }

    pub async fn select_element(&self, timeout: Duration) -> Result<Value> {
        if let Some(ws) = &self.shared.workspace {
            let _ = crate::ipc::send(ws, IpcRequest { id: "select".into(), payload: IpcRequestPayload::StartElementSelect }, self.shared.config.ipc_timeout).await;
        }
        let session = self.open_session().await?;
        let result = session.evaluate(ELEMENT_PICKER_SCRIPT, timeout).await;
        if let Some(ws) = &self.shared.workspace {
            let _ = crate::ipc::send(ws, IpcRequest { id: "cancel-select".into(), payload: IpcRequestPayload::CancelElementSelect }, self.shared.config.ipc_timeout).await;
        }
        let raw = result?;
        match raw.as_str() {
            Some(json_text) => serde_json::from_str(json_text).map_err(CoreError::from),
            None => Ok(raw),
        }
    }

    pub async fn get_dom(&self, selector: Option<&str>, depth: Option<u32>) -> Result<String> {
        let session = self.open_session().await?;
        let expression = dom_expression(selector, depth);
        let value = session.evaluate(&expression, Duration::from_secs(10)).await?;
        let mut html = value.as_str().unwrap_or_default().to_string();
        if html.len() > 100_000 {
            html.truncate(100_000);
        }
        Ok(html)
    }

    pub async fn screenshot(&self, opts: ScreenshotOptions) -> Result<ScreenshotResult> {
        let session = self.open_session().await?;
        let (clip, capture_beyond_viewport) = self.resolve_clip(&session, &opts).await?;
        let format = opts.format.clone().unwrap_or_else(|| "png".to_string());
        let base64 = session.capture_screenshot(&format, clip, capture_beyond_viewport, Duration::from_secs(30)).await?;

        let dir = opts.output_dir.unwrap_or_else(default_screenshot_dir);
        tokio::fs::create_dir_all(&dir).await?;
        let timestamp = iso_now();
        let path = dir.join(format!("screenshot-{timestamp}.{format}"));
        let bytes = base64_decode(&base64)?;
        tokio::fs::write(&path, &bytes).await?;

        Ok(ScreenshotResult { path, base64 })
    }

    /// Resolves the capture region, honouring `clip > selector > fullPage >
    /// viewport` precedence. `fullPage` is distinguished from the plain
    /// viewport default by an explicit clip spanning the full scrollable
    /// document, captured with `captureBeyondViewport` so content outside
    /// the visible viewport is actually rendered.
    async fn resolve_clip(&self, session: &CdpSession, opts: &ScreenshotOptions) -> Result<(Option<Value>, bool)> {
        if let Some((x, y, width, height)) = opts.clip {
            return Ok((Some(json!({ "x": x, "y": y, "width": width, "height": height, "scale": 1 })), false));
        }
        if let Some(selector) = &opts.selector {
            let expr = format!(
                "(() => {{ const el = document.querySelector({sel}); if (!el) return null; const r = el.getBoundingClientRect(); return {{ x: r.x, y: r.y, width: r.width, height: r.height }}; }})()",
                sel = serde_json::to_string(selector)?
            );
            let value = session.evaluate(&expr, Duration::from_secs(10)).await?;
            if value.is_null() {
                return Err(CoreError::ElementNotFound { selector: selector.clone() });
            }
            return Ok((
                Some(json!({
                    "x": value["x"], "y": value["y"], "width": value["width"], "height": value["height"], "scale": 1
                })),
                false,
            ));
        }
        if opts.full_page {
            let (width, height) = session.content_size(Duration::from_secs(10)).await?;
            let clip = json!({ "x": 0, "y": 0, "width": width, "height": height, "scale": 1 });
            return Ok((Some(clip), true));
        }
        Ok((None, false))
    }

    /// Runs the fetch in a short-lived background tab, closed best-effort
    /// on any exit path so the user's real tab is never disturbed.
    pub async fn fetch(&self, request: FetchRequest) -> Result<String> {
        let backend_port = self.backend_port().await.ok_or_else(|| CoreError::Evaluation("no browser backend available".into()))?;
        let (target_id, ws_url) = create_background_target(backend_port).await?;
        let result = self.fetch_in_target(&ws_url, &request).await;
        let _ = close_target(backend_port, &target_id).await;
        result
    }

    async fn fetch_in_target(&self, ws_url: &str, request: &FetchRequest) -> Result<String> {
        let session = CdpSession::connect(ws_url).await?;
        let timeout = request.timeout.unwrap_or(Duration::from_secs(30));

        let requested_origin = url::Url::parse(&request.url).map_err(|e| CoreError::InvalidArgument(e.to_string()))?.origin().ascii_serialization();

        session.call("Page.enable", json!({}), timeout).await?;
        session.navigate_and_wait_for_load(&request.url, timeout).await?;

        let actual_origin = session
            .evaluate("window.location.origin", timeout)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string();
        if actual_origin != requested_origin {
            return Err(CoreError::OriginMismatch { expected: requested_origin, actual: actual_origin });
        }

        let method = request.method.clone().unwrap_or_else(|| "GET".to_string());
        let headers = request.headers.clone().unwrap_or_else(|| json!({}));
        let body = request.body.clone().unwrap_or_default();
        let expression = format!(
            "fetch({url}, {{ method: {method}, headers: {headers}, body: {body}, credentials: 'include' }}).then(r => r.text())",
            url = serde_json::to_string(&request.url)?,
            method = serde_json::to_string(&method)?,
            headers = serde_json::to_string(&headers)?,
            body = if body.is_empty() { "undefined".to_string() } else { serde_json::to_string(&body)? },
        );
        let result = session.evaluate(&expression, timeout).await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.stop_browser().await?;
        self.proxy.close().await;
        rendezvous::clear();
        Ok(())
    }

    async fn backend_port(&self) -> Option<u16> {
        self.shared.instance.lock().await.as_ref().map(|i| i.port)
    }

    async fn open_session(&self) -> Result<CdpSession> {
        let port = self.backend_port().await.ok_or_else(|| CoreError::Evaluation("no browser backend available".into()))?;
        let ws_url = page_target_ws_url(port).await?;
        CdpSession::connect(&ws_url).await
    }
}

async fn lazy_launch(shared: &Arc<Shared>) -> Result<u16> {
    lazy_launch_with_opts(shared, LaunchOptions { kind: shared.config.default_kind, headless: Some(shared.config.headless) }).await
}

async fn lazy_launch_with_opts(shared: &Arc<Shared>, opts: LaunchOptions) -> Result<u16> {
    if let Some(ws) = &shared.workspace {
        if let Some(state) = fetch_editor_state(ws).await {
            if let Some(port) = state.cdp_port {
                return Ok(port);
            }
        }
    }

    let browsers = detector::enumerate();
    let kind = opts.kind.or(shared.config.default_kind);
    let descriptor = detector::pick(kind, &browsers).ok_or(CoreError::NoBrowser)?;
    let port = launcher::allocate_free_port()?;
    let headless = opts.headless.or(Some(shared.config.headless));
    let launch_opts = LaunchOptions { kind: Some(descriptor.kind), headless };
    let instance = tokio::task::spawn_blocking(move || launcher::launch(&descriptor, port, &launch_opts)).await.map_err(|e| CoreError::Evaluation(e.to_string()))??;
    let bound_port = instance.port;
    *shared.instance.lock().await = Some(instance);
    Ok(bound_port)
}

async fn fetch_editor_state(workspace: &std::path::Path) -> Option<EditorState> {
    if !crate::ipc::probe(workspace).await {
        return None;
    }
    let response = crate::ipc::send(workspace, IpcRequest { id: "get-state".into(), payload: IpcRequestPayload::GetState }, Duration::from_secs(2)).await.ok()?;
    match response.payload {
        IpcResponsePayload::State { state } => Some(state),
        _ => None,
    }
}

fn navigate_request(url: &str) -> IpcRequest {
    IpcRequest { id: "navigate".into(), payload: IpcRequestPayload::Navigate { url: url.to_string() } }
}

fn dom_expression(selector: Option<&str>, depth: Option<u32>) -> String {
    let root = match selector {
        Some(sel) => format!("document.querySelector({sel})", sel = serde_json::to_string(sel).unwrap_or_default()),
        None => "document.documentElement".to_string(),
    };
    match depth {
        Some(depth) => format!(
            r#"(() => {{
  const root = {root};
  if (!root) return null;
  const render = (node, remaining) => {{
    if (remaining === 0) return node.tagName ? `<${{node.tagName.toLowerCase()}}>…</${{node.tagName.toLowerCase()}}>` : '';
    const clone = node.cloneNode(false);
    for (const child of node.children) {{
      clone.appendChild(new DOMParser().parseFromString(render(child, remaining - 1), 'text/html').body.firstChild || document.createTextNode(''));
    }}
    return clone.outerHTML;
  }};
  return render(root, {depth});
}})()"#
        ),
        None => format!("(() => {{ const root = {root}; return root ? root.outerHTML : null; }})()"),
    }
}

const ELEMENT_PICKER_SCRIPT: &str = r#"
new Promise((resolve) => {
  const handler = (event) => {
    event.preventDefault();
    document.removeEventListener('click', handler, true);
    const el = event.target;
    const r = el.getBoundingClientRect();
    resolve(JSON.stringify({
      selector: el.tagName.toLowerCase() + (el.id ? '#' + el.id : ''),
      x: r.x, y: r.y, width: r.width, height: r.height,
    }));
  };
  document.addEventListener('click', handler, true);
})
"#;

fn default_screenshot_dir() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    std::env::temp_dir().join("browser-coordinator").join("screenshots").join(crate::ipc::path::workspace_hash(&cwd))
}

fn iso_now() -> String {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    format!("{}", now.as_millis())
}

fn base64_decode(data: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(data).map_err(|e| CoreError::Evaluation(e.to_string()))
}
