// Shared bootstrapping and WebSocket helpers for the integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Base URL published once the background server has bound its port.
static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts the server once per test binary and returns its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // A dedicated OS thread keeps the server alive across `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                vine_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub async fn connect_ws() -> WsStream {
    let url = format!("{}/ws", ensure_server().replacen("http", "ws", 1));
    let (ws, _) = connect_async(url).await.expect("websocket connect");
    ws
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(Message::Text(text.into()))
        .await
        .expect("websocket send");
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    send_text(ws, &value.to_string()).await;
}

/// Next text frame, or `None` once the server closed the socket.
pub async fn next_text(ws: &mut WsStream) -> Option<String> {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame");
        match next {
            Some(Ok(Message::Text(text))) => return Some(text.as_str().to_owned()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

pub async fn next_json(ws: &mut WsStream) -> Value {
    let text = next_text(ws).await.expect("socket closed unexpectedly");
    serde_json::from_str(&text).expect("frame should be json")
}

/// Waits for the first message of `kind`, skipping snapshots and anything else.
pub async fn next_of_type(ws: &mut WsStream, kind: &str) -> Value {
    for _ in 0..500 {
        let value = next_json(ws).await;
        if value["type"] == kind {
            return value;
        }
    }
    panic!("no {kind} message received");
}

/// Opens a session as its player and returns the socket with the session id.
pub async fn join(name: &str) -> (WsStream, u64) {
    let mut ws = connect_ws().await;
    send_json(
        &mut ws,
        serde_json::json!({ "type": "Join", "data": { "name": name } }),
    )
    .await;

    let identity = next_of_type(&mut ws, "Identity").await;
    assert_eq!(identity["data"]["role"], "player");
    let session_id = identity["data"]["session_id"]
        .as_u64()
        .expect("session id should be numeric");
    (ws, session_id)
}

pub async fn spectate(session_id: u64) -> WsStream {
    let mut ws = connect_ws().await;
    send_json(
        &mut ws,
        serde_json::json!({ "type": "Spectate", "data": { "session_id": session_id } }),
    )
    .await;
    ws
}
