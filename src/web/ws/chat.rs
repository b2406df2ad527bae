//! Chat WebSocket handler.
//!
//! Each socket becomes one coordinator connection. Inbound text frames are
//! parsed as [`ClientEvent`]s; events queued for the connection are written
//! back as JSON text frames.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::chat::{BroadcastCoordinator, ClientEvent, ConnectionId, ServerEvent};
use crate::web::handlers::AppState;

/// WebSocket chat handler.
///
/// GET /ws
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let coordinator = state.coordinator.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

/// Handle a WebSocket connection until either side closes it.
async fn handle_socket(socket: WebSocket, coordinator: BroadcastCoordinator) {
    let connection = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (outbox, mut events) = coordinator.outbox();

    if let Err(e) = coordinator.connect(connection, outbox).await {
        tracing::warn!(%connection, error = %e, "Rejecting WebSocket session");
        return;
    }
    tracing::debug!(%connection, "WebSocket session started");

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match parse_client_event(&text) {
                        Some(event) => coordinator.handle(connection, event).await,
                        None => continue,
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(%connection, "WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%connection, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            Some(event) = events.recv() => {
                let Some(json) = encode_server_event(&event) else {
                    continue;
                };
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    coordinator.disconnect(connection).await;
    tracing::debug!(%connection, "WebSocket session ended");
}

/// Parse an inbound frame, logging and dropping anything malformed.
fn parse_client_event(text: &str) -> Option<ClientEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed client event");
            None
        }
    }
}

fn encode_server_event(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(event = event.name(), error = %e, "Failed to encode event");
            None
        }
    }
}
