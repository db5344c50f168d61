use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::Shared;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

type LaunchFuture = Shared<Pin<Box<dyn Future<Output = Arc<std::result::Result<u16, String>>> + Send>>>;
type LaunchCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = std::result::Result<u16, String>> + Send>> + Send + Sync>;

struct Inner {
    backend: Mutex<Option<u16>>,
    launch_cb: Mutex<Option<LaunchCallback>>,
    in_flight_launch: Mutex<Option<LaunchFuture>>,
    connections: Mutex<HashMap<u64, tokio::sync::oneshot::Sender<()>>>,
    next_conn_id: std::sync::atomic::AtomicU64,
    shutdown: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

/// The byte-transparent TCP reverse proxy. Never parses what it carries.
pub struct Proxy {
    inner: Arc<Inner>,
    port: u16,
}

impl Proxy {
    /// Binds the listener and spawns the accept loop. `requested_port`
    /// of `0` asks the OS for a free port.
    pub async fn listen(requested_port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", requested_port)).await.map_err(CoreError::ProxyBindFailed)?;
        let port = listener.local_addr().map_err(CoreError::ProxyBindFailed)?.port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let inner = Arc::new(Inner {
            backend: Mutex::new(None),
            launch_cb: Mutex::new(None),
            in_flight_launch: Mutex::new(None),
            connections: Mutex::new(HashMap::new()),
            next_conn_id: std::sync::atomic::AtomicU64::new(0),
            shutdown: Mutex::new(Some(shutdown_tx)),
        });
        let accept_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            accept_loop(listener, accept_inner, shutdown_rx).await;
        });
        Ok(Self { inner, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Registers the single lazy-launch callback. Replacing it before
    /// the first connection is allowed; the caller is responsible for
    /// not racing a replacement against an in-flight launch.
    pub async fn on_lazy_launch<F, Fut>(&self, cb: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<u16, String>> + Send + 'static,
    {
        let wrapped: LaunchCallback = Arc::new(move || Box::pin(cb()));
        *self.inner.launch_cb.lock().await = Some(wrapped);
    }

    pub async fn set_backend(&self, port: u16) {
        *self.inner.backend.lock().await = Some(port);
    }

    pub async fn clear_backend(&self) {
        *self.inner.backend.lock().await = None;
    }

    pub async fn close_connections(&self) {
        close_all(&self.inner).await;
    }

    /// Stops the accept loop and tears down all live connections. No
    /// further accepts succeed after this resolves, including one that
    /// was already in-flight when `close` was called.
    pub async fn close(&self) {
        if let Some(tx) = self.inner.shutdown.lock().await.take() {
            let _ = tx.send(());
        }
        close_all(&self.inner).await;
    }
}

async fn close_all(inner: &Arc<Inner>) {
    let mut conns = inner.connections.lock().await;
    for (_, tx) in conns.drain() {
        let _ = tx.send(());
    }
}

/// Races each accept against the shutdown signal so a connection already
/// in-flight in the kernel backlog when `close()` runs cannot slip through
/// after the proxy has declared itself closed.
async fn accept_loop(listener: TcpListener, inner: Arc<Inner>, mut shutdown_rx: tokio::sync::oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => return,
            accepted = listener.accept() => {
                match accepted {
                    Ok((client, _addr)) => {
                        let inner = Arc::clone(&inner);
                        tokio::spawn(async move {
                            handle_connection(client, inner).await;
                        });
                    }
                    Err(err) => {
                        warn!(target = "bcd.proxy", %err, "accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection(mut client: TcpStream, inner: Arc<Inner>) {
    let conn_id = inner.next_conn_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let (close_tx, close_rx) = tokio::sync::oneshot::channel();
    inner.connections.lock().await.insert(conn_id, close_tx);

    let backend_port = {
        let existing = *inner.backend.lock().await;
        match existing {
            Some(port) => Some(port),
            None => ensure_backend(&inner).await,
        }
    };

    let Some(backend_port) = backend_port else {
        inner.connections.lock().await.remove(&conn_id);
        return;
    };

    let mut backend = match TcpStream::connect(("127.0.0.1", backend_port)).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(target = "bcd.proxy", %err, backend_port, "backend connect failed");
            inner.connections.lock().await.remove(&conn_id);
            return;
        }
    };

    tokio::select! {
        _ = tokio::io::copy_bidirectional(&mut client, &mut backend) => {}
        _ = close_rx => {}
    }

    inner.connections.lock().await.remove(&conn_id);
}

/// Runs the registered lazy-launch callback exactly once for any number
/// of concurrently-arriving callers, via a shared future cell.
async fn ensure_backend(inner: &Arc<Inner>) -> Option<u16> {
    let cb = inner.launch_cb.lock().await.clone()?;

    let shared: LaunchFuture = {
        let mut slot = inner.in_flight_launch.lock().await;
        if let Some(existing) = slot.as_ref() {
            existing.clone()
        } else {
            let fut: Pin<Box<dyn Future<Output = Arc<std::result::Result<u16, String>>> + Send>> = Box::pin(async move { Arc::new(cb().await) });
            let shared = fut.shared();
            *slot = Some(shared.clone());
            shared
        }
    };

    let result = shared.await;
    // Clear the cell once resolved so the next lazy-launch trigger (e.g.
    // after a later stop) starts a fresh invocation.
    *inner.in_flight_launch.lock().await = None;

    match result.as_ref() {
        Ok(port) => {
            *inner.backend.lock().await = Some(*port);
            Some(*port)
        }
        Err(err) => {
            warn!(target = "bcd.proxy", %err, "lazy launch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo_backend() -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    loop {
                        match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => {
                                if sock.write_all(&buf[..n]).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn port_is_stable_across_backend_changes() {
        let proxy = Proxy::listen(0).await.unwrap();
        let port = proxy.port();
        proxy.set_backend(echo_backend().await).await;
        assert_eq!(proxy.port(), port);
        proxy.clear_backend().await;
        assert_eq!(proxy.port(), port);
    }

    #[tokio::test]
    async fn byte_transparency_round_trips_arbitrary_bytes() {
        let proxy = Proxy::listen(0).await.unwrap();
        proxy.set_backend(echo_backend().await).await;

        let mut client = TcpStream::connect(("127.0.0.1", proxy.port())).await.unwrap();
        let payload = b"\x00\x01GET / HTTP/1.1\r\n\r\n\xff\xfe binary noise";
        client.write_all(payload).await.unwrap();

        let mut received = vec![0u8; payload.len()];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(&received[..], &payload[..]);
    }

    #[tokio::test]
    async fn single_flight_lazy_launch_invoked_once_for_concurrent_connections() {
        let proxy = Proxy::listen(0).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        proxy
            .on_lazy_launch(move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok(echo_backend().await)
                }
            })
            .await;

        let port = proxy.port();
        let mut handles = Vec::new();
        for _ in 0..5 {
            handles.push(tokio::spawn(async move {
                let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                client.write_all(b"hi").await.unwrap();
                let mut buf = [0u8; 2];
                let _ = client.read_exact(&mut buf).await;
            }));
        }
        for h in handles {
            let _ = h.await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
