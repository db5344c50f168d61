//! A minimal in-process IPC server implementing the wire contract of
//! §4.D. Used only by this crate's own integration tests to exercise
//! round-trip and stale-socket-reaping behavior without requiring a
//! real editor-host process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bcd_protocol::{EditorState, IpcRequest, IpcRequestPayload, IpcResponse, IpcResponsePayload};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

pub struct FixtureServer {
    pub path: PathBuf,
    state: Arc<Mutex<EditorState>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn spawn(path: &Path, initial_state: EditorState) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let _ = tokio::fs::remove_file(path).await;
        let listener = tokio::net::UnixListener::bind(path)?;
        let state = Arc::new(Mutex::new(initial_state));
        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let state = Arc::clone(&accept_state);
                        tokio::spawn(async move {
                            let _ = serve_one(stream, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });
        Ok(Self { path: path.to_path_buf(), state, handle })
    }

    pub fn set_active_url(&self, url: impl Into<String>) {
        self.state.lock().expect("fixture state lock poisoned").active_url = Some(url.into());
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}

async fn serve_one(stream: tokio::net::UnixStream, state: Arc<Mutex<EditorState>>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = String::new();
    if reader.read_line(&mut buf).await? == 0 {
        return Ok(());
    }
    let response = match serde_json::from_str::<IpcRequest>(buf.trim_end()) {
        Ok(request) => handle(request, &state),
        Err(err) => IpcResponse::error("unknown", format!("malformed request: {err}")),
    };
    let mut line = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

fn handle(request: IpcRequest, state: &Arc<Mutex<EditorState>>) -> IpcResponse {
    match request.payload {
        IpcRequestPayload::Ping => IpcResponse::ok(request.id),
        IpcRequestPayload::GetState => {
            let state = state.lock().expect("fixture state lock poisoned").clone();
            IpcResponse::state(request.id, state)
        }
        IpcRequestPayload::Navigate { url } => {
            state.lock().expect("fixture state lock poisoned").active_url = Some(url);
            IpcResponse::ok(request.id)
        }
        IpcRequestPayload::StartElementSelect | IpcRequestPayload::CancelElementSelect => IpcResponse::ok(request.id),
    }
}
