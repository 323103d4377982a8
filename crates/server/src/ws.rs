//! WebSocket endpoint for note synchronization.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use notewell_collab::protocol::ClientMessage;

use crate::room::{ConnId, Rooms};
use crate::AppState;

/// Upgrade handler for `/ws/note/{id}`
pub async fn ws_note(
    State(app): State<AppState>,
    Path(note_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(app.rooms, note_id, socket))
}

async fn handle_socket(rooms: Rooms, note_id: String, socket: WebSocket) {
    let conn = ConnId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let room = rooms.join(&note_id, conn, tx);
    tracing::info!(note = %note_id, conn = %conn.0, "connection opened");

    // Writer task: drain the room's outbound queue into the socket.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        // Only `sync` frames exist client-to-server; drop the rest.
        match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(ClientMessage::Sync {
                base_hash,
                operations,
            }) => room.process_sync(conn, &base_hash, &operations),
            Err(err) => {
                tracing::debug!(note = %note_id, %err, "ignoring malformed frame");
            }
        }
    }

    rooms.leave(&note_id, conn);
    writer.abort();
    tracing::info!(note = %note_id, conn = %conn.0, "connection closed");
}
