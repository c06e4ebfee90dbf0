//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use noteboard_shared::time::now_millis;
use tokio::sync::mpsc;

use crate::{
    domain::ClientId,
    infrastructure::dto::websocket::WsMessage,
    ui::state::AppState,
    usecase::{
        ConnectClientUseCase, DisconnectClientUseCase, HeartbeatUseCase, JoinCanvasUseCase,
        LeaveCanvasUseCase, UpdateError, UpdateNotesUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // A full queue evicts the session
    let (tx, mut rx) = mpsc::channel::<String>(state.config.outbound_buffer);

    let connect_usecase = ConnectClientUseCase::new(state.registry.clone());
    let client_id = match connect_usecase.execute(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            return;
        }
    };
    tracing::info!("Client '{}' connected", client_id);

    let (mut sender, mut receiver) = socket.split();

    let client_id_clone = client_id.clone();
    let state_clone = state.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error from '{}': {}", client_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&state_clone, &client_id_clone, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", client_id_clone);
                    break;
                }
                // Protocol-level ping/pong is answered by the WebSocket layer
                _ => {}
            }
        }
    });

    // Spawn a task to forward queued messages to this client. The queue ends
    // when the registry drops the session, which closes the transport.
    let client_id_send = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        tracing::debug!("Outbound queue of '{}' closed", client_id_send);
        let _ = sender.send(Message::Close(None)).await;
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    DisconnectClientUseCase::new(state.registry.clone())
        .execute(&client_id)
        .await;
}

/// Dispatch one text frame.
///
/// Malformed frames and unknown types are logged and dropped.
async fn handle_text(state: &AppState, client_id: &ClientId, text: &str) {
    let msg = match WsMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Dropping malformed frame from '{}': {}", client_id, e);
            return;
        }
    };
    tracing::debug!("Received '{}' from '{}'", msg.kind(), client_id);

    match msg {
        WsMessage::JoinCanvas { canvas_id, .. } => {
            let usecase = JoinCanvasUseCase::new(state.registry.clone());
            if let Err(e) = usecase.execute(client_id, canvas_id).await {
                tracing::warn!("Client '{}' failed to join: {}", client_id, e);
            }
        }
        WsMessage::LeaveCanvas { .. } => {
            let usecase = LeaveCanvasUseCase::new(state.registry.clone());
            if let Err(e) = usecase.execute(client_id).await {
                tracing::warn!("Client '{}' failed to leave: {}", client_id, e);
            }
        }
        WsMessage::NotesUpdate { notes, .. } => {
            let usecase = UpdateNotesUseCase::new(state.registry.clone());
            match usecase.execute(client_id, notes).await {
                Ok(_) => {}
                Err(UpdateError::NotInCanvas(_)) => {
                    tracing::debug!("Dropping update from unbound client '{}'", client_id);
                }
                Err(e) => tracing::warn!("Failed to relay update from '{}': {}", client_id, e),
            }
        }
        WsMessage::Ping { .. } => {
            let heartbeat = HeartbeatUseCase::new(
                state.registry.clone(),
                state.config.heartbeat_timeout,
            );
            if heartbeat.record_pong(client_id).await.is_err() {
                return;
            }
            match WsMessage::pong(now_millis()).to_json() {
                Ok(pong) => {
                    state.registry.send_to(client_id, pong).await;
                }
                Err(e) => tracing::error!("Failed to encode pong: {}", e),
            }
        }
        WsMessage::Pong { .. } => {
            let heartbeat = HeartbeatUseCase::new(
                state.registry.clone(),
                state.config.heartbeat_timeout,
            );
            if let Err(e) = heartbeat.record_pong(client_id).await {
                tracing::debug!("Ignoring pong: {}", e);
            }
        }
        WsMessage::Unknown => {
            tracing::warn!("Ignoring unknown message type from '{}'", client_id);
        }
    }
}
