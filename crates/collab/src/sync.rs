//! Three-buffer reconciliation between the editor and the server.

use notewell_diff::diff;
use notewell_ot::{apply, ops_from_diff, transform, Op, OtError};

/// Payload for the next `sync` frame the client should send
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub base_hash: String,
    pub operations: Vec<Op>,
}

/// Reconciliation state for one note connection: `synchronized` mirrors
/// the server, `in_flight` awaits its ack, `pending` queues behind it
#[derive(Debug, Clone)]
pub struct NoteSync {
    latest_hash: String,
    synchronized: String,
    in_flight: Option<Vec<Op>>,
    pending: Option<Vec<Op>>,
}

impl NoteSync {
    pub fn new(latest_hash: impl Into<String>, synchronized: impl Into<String>) -> Self {
        Self {
            latest_hash: latest_hash.into(),
            synchronized: synchronized.into(),
            in_flight: None,
            pending: None,
        }
    }

    /// Last server hash this client has integrated
    pub fn latest_hash(&self) -> &str {
        &self.latest_hash
    }

    /// Cached server content at [`latest_hash`](Self::latest_hash)
    pub fn synchronized(&self) -> &str {
        &self.synchronized
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|ops| !ops.is_empty())
    }

    /// Text the editor should display: server state plus every local edit
    pub fn rendered(&self) -> Result<String, OtError> {
        let mut text = self.synchronized.clone();
        if let Some(ops) = &self.in_flight {
            text = apply(&text, ops)?;
        }
        if let Some(ops) = &self.pending {
            text = apply(&text, ops)?;
        }
        Ok(text)
    }

    /// Record the editor's text after a quiet period; returns the frame
    /// to send when no sync is outstanding
    pub fn local_edit(&mut self, editor_text: &str) -> Result<Option<SyncRequest>, OtError> {
        let predicted = self.rendered()?;
        let ops = ops_from_diff(&diff(&predicted, editor_text));
        if ops.is_empty() {
            return Ok(None);
        }

        if self.in_flight.is_none() {
            self.in_flight = Some(ops.clone());
            Ok(Some(SyncRequest {
                base_hash: self.latest_hash.clone(),
                operations: ops,
            }))
        } else {
            self.pending.get_or_insert_with(Vec::new).extend(ops);
            Ok(None)
        }
    }

    /// The server committed our in-flight operations; promote the
    /// prediction and return any queued follow-up sync
    pub fn handle_ack(&mut self, new_hash: &str) -> Result<Option<SyncRequest>, OtError> {
        if let Some(ops) = self.in_flight.take() {
            self.synchronized = apply(&self.synchronized, &ops)?;
        }
        self.latest_hash = new_hash.to_string();

        match self.pending.take() {
            Some(ops) if !ops.is_empty() => {
                self.in_flight = Some(ops.clone());
                Ok(Some(SyncRequest {
                    base_hash: self.latest_hash.clone(),
                    operations: ops,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Integrate a remote edit, rebasing both local buffers over it
    pub fn handle_update(&mut self, latest_hash: &str, operations: &[Op]) -> Result<(), OtError> {
        self.synchronized = apply(&self.synchronized, operations)?;
        if let Some(ops) = &self.in_flight {
            self.in_flight = Some(transform(ops, operations));
        }
        if let Some(ops) = &self.pending {
            self.pending = Some(transform(ops, operations));
        }
        self.latest_hash = latest_hash.to_string();
        Ok(())
    }

    /// Drop all local state and restart from fetched server state
    pub fn reset(&mut self, latest_hash: impl Into<String>, content: impl Into<String>) {
        self.latest_hash = latest_hash.into();
        self.synchronized = content.into();
        self.in_flight = None;
        self.pending = None;
    }
}
