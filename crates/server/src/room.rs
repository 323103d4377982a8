//! Per-note rooms: serialized merge processing and connection fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use notewell_collab::protocol::ServerMessage;
use notewell_history::VersionStore;
use notewell_ot::Op;

use crate::merge::{process_sync, SyncOutcome, UNKNOWN_BASE_MESSAGE};

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial empty commit";

/// Connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound frame queue of one connection
pub type ConnSender = mpsc::UnboundedSender<ServerMessage>;

/// Point-in-time view of a note for the HTTP API
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSnapshot {
    pub latest_hash: Option<String>,
    pub latest_content: Option<String>,
}

/// One note's server-side state.
///
/// The mutex serializes joins, leaves, syncs, and snapshots; nothing
/// awaits while it is held.
pub struct Room {
    note_id: String,
    state: Mutex<RoomState>,
}

struct RoomState {
    history: VersionStore,
    connections: HashMap<ConnId, ConnSender>,
}

impl Room {
    fn new(note_id: &str) -> Self {
        let mut history = VersionStore::new();
        history.commit("", INITIAL_COMMIT_MESSAGE);
        Self {
            note_id: note_id.to_string(),
            state: Mutex::new(RoomState {
                history,
                connections: HashMap::new(),
            }),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn snapshot(&self) -> NoteSnapshot {
        let state = self.state.lock();
        NoteSnapshot {
            latest_hash: state.history.head().map(str::to_string),
            latest_content: state.history.head_content(),
        }
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Process one sync request: reply to the sender, fan out to the rest
    pub fn process_sync(&self, conn: ConnId, base_hash: &str, operations: &[Op]) {
        let mut state = self.state.lock();

        match process_sync(&mut state.history, base_hash, operations) {
            SyncOutcome::FastForward { new_hash, broadcast }
            | SyncOutcome::Merged { new_hash, broadcast } => {
                tracing::debug!(
                    note = %self.note_id,
                    hash = %new_hash,
                    ops = broadcast.len(),
                    "sync committed"
                );
                // Ack first: it must precede updates from the same commit.
                state.send_to(conn, ServerMessage::Ack { new_hash: new_hash.clone() });
                if !broadcast.is_empty() {
                    state.send_to_others(
                        conn,
                        ServerMessage::Update {
                            latest_hash: new_hash,
                            operations: broadcast,
                        },
                    );
                }
            }
            SyncOutcome::UnknownBase => {
                tracing::warn!(note = %self.note_id, base = %base_hash, "sync against unknown base");
                state.send_to(
                    conn,
                    ServerMessage::Error {
                        message: UNKNOWN_BASE_MESSAGE.to_string(),
                    },
                );
            }
            SyncOutcome::Conflict { message } => {
                tracing::warn!(note = %self.note_id, %message, "merge conflict");
                state.send_to(conn, ServerMessage::Conflict { message });
            }
        }
    }
}

impl RoomState {
    fn send_to(&self, conn: ConnId, msg: ServerMessage) {
        if let Some(tx) = self.connections.get(&conn) {
            let _ = tx.send(msg);
        }
    }

    fn send_to_others(&self, sender: ConnId, msg: ServerMessage) {
        for (conn, tx) in &self.connections {
            if *conn != sender {
                let _ = tx.send(msg.clone());
            }
        }
    }

    fn broadcast_user_count(&self) {
        let msg = ServerMessage::UserCountUpdate {
            count: self.connections.len(),
        };
        for tx in self.connections.values() {
            let _ = tx.send(msg.clone());
        }
    }
}

/// Registry of live rooms keyed by note id.
///
/// Creation and removal share the registry lock, so a join racing a
/// teardown lands in a fresh room rather than a dead one.
#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<String, Arc<Room>>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for `note_id`, created on first reference
    pub fn get_or_create(&self, note_id: &str) -> Arc<Room> {
        obtain(&mut self.inner.lock(), note_id)
    }

    /// Register a connection, announcing the new member count to everyone
    pub fn join(&self, note_id: &str, conn: ConnId, tx: ConnSender) -> Arc<Room> {
        let mut rooms = self.inner.lock();
        let room = obtain(&mut rooms, note_id);
        let mut state = room.state.lock();
        state.connections.insert(conn, tx);
        state.broadcast_user_count();
        drop(state);
        room
    }

    /// Drop a connection; the room goes with its last member
    pub fn leave(&self, note_id: &str, conn: ConnId) {
        let mut rooms = self.inner.lock();
        let Some(room) = rooms.get(note_id).map(Arc::clone) else {
            return;
        };
        let mut state = room.state.lock();
        state.connections.remove(&conn);
        let empty = state.connections.is_empty();
        if !empty {
            state.broadcast_user_count();
        }
        drop(state);
        if empty {
            tracing::info!(note = %note_id, "last connection closed, dropping room");
            rooms.remove(note_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().len()
    }
}

fn obtain(rooms: &mut HashMap<String, Arc<Room>>, note_id: &str) -> Arc<Room> {
    if let Some(room) = rooms.get(note_id) {
        return Arc::clone(room);
    }
    tracing::info!(note = %note_id, "creating room");
    let room = Arc::new(Room::new(note_id));
    rooms.insert(note_id.to_string(), Arc::clone(&room));
    room
}
