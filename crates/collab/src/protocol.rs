//! Wire protocol for note synchronization.
//!
//! Every WebSocket frame is JSON of shape `{type, payload}`.

use notewell_ot::Op;
use serde::{Deserialize, Serialize};

/// Client -> server frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit operations authored against the revision at `base_hash`
    Sync {
        base_hash: String,
        operations: Vec<Op>,
    },
}

/// Server -> client frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The sender's sync was committed as `new_hash`
    Ack { new_hash: String },
    /// Another client's edit was committed; apply `operations` to catch up
    Update {
        latest_hash: String,
        operations: Vec<Op>,
    },
    /// Reconciliation failed; discard local state and reload
    Conflict { message: String },
    /// The sync was rejected outright (e.g. unknown base hash)
    Error { message: String },
    /// Number of connected editors changed
    UserCountUpdate { count: usize },
}

/// Body of `GET /api/note/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub status: String,
    pub latest_hash: Option<String>,
    pub latest_content: Option<String>,
}
