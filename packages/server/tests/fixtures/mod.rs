//! Test server and WebSocket client helpers shared by the integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use noteboard_server::{ServerConfig, serve};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

/// Server running in-process on an ephemeral port. Stopped on drop.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        })
        .await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = serve(listener, config, shutdown).await {
                eprintln!("test server error: {e}");
            }
        });

        Self {
            addr,
            shutdown: Some(tx),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn stats(&self) -> Value {
        reqwest::get(format!("{}/stats", self.base_url()))
            .await
            .expect("Failed to fetch stats")
            .json()
            .await
            .expect("Failed to parse stats")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Raw protocol client
pub struct WsClient {
    pub client_id: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect and read the greeting ping that carries the session id.
    pub async fn connect(url: &str) -> Self {
        let (mut stream, _) = connect_async(url).await.expect("Failed to connect");
        let hello = next_json(&mut stream, Duration::from_secs(2))
            .await
            .expect("No greeting received");
        assert_eq!(hello["type"], "ping");
        let client_id = hello["clientId"]
            .as_str()
            .expect("Greeting without clientId")
            .to_string();
        Self { client_id, stream }
    }

    pub async fn send_json(&mut self, value: Value) {
        self.stream
            .send(Message::text(value.to_string()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("Failed to send frame");
    }

    /// Round-trip a ping. Frames are handled in order, so every frame sent
    /// before this one has been processed once the pong arrives.
    pub async fn sync(&mut self) {
        self.send_json(json!({"type": "ping", "timestamp": 0})).await;
        loop {
            let frame = self
                .recv_timeout(Duration::from_secs(2))
                .await
                .expect("No pong received");
            if frame["type"] == "pong" {
                return;
            }
        }
    }

    pub async fn join(&mut self, canvas_id: &str) {
        self.send_json(json!({"type": "join_canvas", "canvasId": canvas_id, "timestamp": 0}))
            .await;
        self.sync().await;
    }

    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Value> {
        next_json(&mut self.stream, timeout).await
    }

    /// Next frame of the given type, skipping others.
    pub async fn recv_type(&mut self, kind: &str, timeout: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let frame = self.recv_timeout(remaining).await?;
            if frame["type"] == kind {
                return Some(frame);
            }
        }
    }

    /// Whether the server closes the connection within `timeout`.
    pub async fn closed_within(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.stream.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

async fn next_json(
    stream: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let msg = tokio::time::timeout(remaining, stream.next()).await.ok()??.ok()?;
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

pub fn note(id: i64, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "position": {"x": 65, "y": 65},
        "size": {"width": 20, "height": 20},
        "zIndex": id
    })
}
