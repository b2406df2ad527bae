//! Test helpers for chat integration tests.
//!
//! Provides in-process clients for the coordinator and a WebSocket client
//! for end-to-end tests against a running server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use murmur::chat::{EventReceiver, OutgoingMessage, Participant, ServerEvent};
use murmur::config::ServerConfig;
use murmur::{BroadcastCoordinator, ConnectionId, MessageId, WebServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection registered directly with a coordinator.
pub struct TestPeer {
    pub connection: ConnectionId,
    pub participant: Participant,
    pub events: EventReceiver,
}

impl TestPeer {
    /// Connect a new peer and discard its welcome events.
    pub async fn join(coordinator: &BroadcastCoordinator) -> Self {
        let mut peer = Self::join_raw(coordinator).await;
        peer.drain();
        peer
    }

    /// Connect a new peer, keeping its welcome events queued.
    pub async fn join_raw(coordinator: &BroadcastCoordinator) -> Self {
        let (tx, rx) = coordinator.outbox();
        let connection = ConnectionId::new();
        let participant = coordinator.connect(connection, tx).await.unwrap();
        Self {
            connection,
            participant,
            events: rx,
        }
    }

    /// Take every event queued so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn public_id(&self) -> &str {
        &self.participant.public_id
    }
}

/// Build an outbound chat message.
pub fn outgoing(id: &str, text: &str) -> OutgoingMessage {
    OutgoingMessage {
        id: Some(MessageId::new(id)),
        text: text.to_string(),
        extra: Map::new(),
    }
}

/// Server configuration bound to an ephemeral local port.
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        serve_static: false,
        static_path: "public".to_string(),
        cors_origins: vec![],
    }
}

/// Start a server on an ephemeral port.
pub async fn start_server(coordinator: BroadcastCoordinator) -> SocketAddr {
    let server = WebServer::new(&test_server_config(), coordinator).unwrap();
    server.run_with_addr().await.unwrap()
}

/// WebSocket client speaking the chat wire format.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect to the chat endpoint of a running server.
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}/ws");
        let (stream, _) = timeout(DEFAULT_TIMEOUT, connect_async(url))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        Self { stream }
    }

    /// Send an event with an optional payload.
    pub async fn send(&mut self, event: &str, data: Option<Value>) {
        let frame = match data {
            Some(data) => json!({ "event": event, "data": data }),
            None => json!({ "event": event }),
        };
        self.send_raw(&frame.to_string()).await;
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(WsMessage::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    /// Receive the next event as JSON.
    pub async fn recv(&mut self) -> Value {
        loop {
            let frame = timeout(DEFAULT_TIMEOUT, self.stream.next())
                .await
                .expect("receive timed out")
                .expect("stream closed")
                .expect("websocket error");
            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Receive events until one with the given name arrives.
    pub async fn recv_event(&mut self, name: &str) -> Value {
        loop {
            let event = self.recv().await;
            if event["event"] == name {
                return event;
            }
        }
    }

    /// Assert nothing arrives within a short window.
    pub async fn expect_silence(&mut self) {
        let next = timeout(Duration::from_millis(200), self.stream.next()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    /// Close the connection.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
