#![cfg(unix)]

use bcd_core::ipc;
use bcd_protocol::EditorState;

#[tokio::test]
async fn ping_and_get_state_round_trip_through_the_fixture_server() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ipc-test.sock");
    let initial = EditorState { active_url: Some("https://example.com".into()), ..Default::default() };
    let server = ipc::fixture::FixtureServer::spawn(&socket_path, initial).await.unwrap();

    let request = bcd_protocol::IpcRequest { id: "1".into(), payload: bcd_protocol::IpcRequestPayload::Ping };
    let response = send_to(&socket_path, request).await;
    assert!(matches!(response.payload, bcd_protocol::IpcResponsePayload::Ok));

    let request = bcd_protocol::IpcRequest { id: "2".into(), payload: bcd_protocol::IpcRequestPayload::GetState };
    let response = send_to(&socket_path, request).await;
    match response.payload {
        bcd_protocol::IpcResponsePayload::State { state } => {
            assert_eq!(state.active_url.as_deref(), Some("https://example.com"));
        }
        other => panic!("expected state response, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn garbled_request_yields_an_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ipc-garbled.sock");
    let server = ipc::fixture::FixtureServer::spawn(&socket_path, EditorState::default()).await.unwrap();

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    let mut stream = tokio::net::UnixStream::connect(&socket_path).await.unwrap();
    stream.write_all(b"not json at all\n").await.unwrap();
    stream.flush().await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: bcd_protocol::IpcResponse = serde_json::from_str(line.trim_end()).unwrap();
    assert!(matches!(response.payload, bcd_protocol::IpcResponsePayload::Error { .. }));

    server.shutdown().await;
}

#[tokio::test]
async fn stale_socket_file_is_reaped_on_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("ipc-stale.sock");
    // Nothing listens on this path, but the file exists (e.g. left
    // behind by a process that crashed without cleaning up).
    std::fs::write(&stale, b"").unwrap();

    let found = ipc::client::discover_in(dir.path(), None).await;
    assert!(found.is_none(), "no live socket should be discovered");
    assert!(!stale.exists(), "stale socket file should have been unlinked");
}

#[tokio::test]
async fn discover_finds_a_live_socket_among_stale_ones() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("ipc-stale.sock");
    std::fs::write(&stale, b"").unwrap();

    let live_path = dir.path().join("ipc-live.sock");
    let server = ipc::fixture::FixtureServer::spawn(&live_path, EditorState::default()).await.unwrap();

    let found = ipc::client::discover_in(dir.path(), None).await;
    assert_eq!(found.as_deref(), Some(live_path.as_path()));
    assert!(!stale.exists());

    server.shutdown().await;
}

async fn send_to(path: &std::path::Path, request: bcd_protocol::IpcRequest) -> bcd_protocol::IpcResponse {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    let mut stream = tokio::net::UnixStream::connect(path).await.unwrap();
    let mut line = serde_json::to_string(&request).unwrap();
    line.push('\n');
    stream.write_all(line.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    reader.read_line(&mut buf).await.unwrap();
    serde_json::from_str(buf.trim_end()).unwrap()
}
