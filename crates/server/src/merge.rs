//! Fast-forward and three-way merge of client syncs.

use notewell_diff::diff;
use notewell_history::VersionStore;
use notewell_ot::{apply, ops_from_diff, transform, Op};

pub const FAST_FORWARD_MESSAGE: &str = "Update from client";
pub const MERGE_MESSAGE: &str = "Merged update from client";
pub const UNKNOWN_BASE_MESSAGE: &str = "Base hash not found. Please reload.";

/// Result of processing one sync request against a note's history
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The client was current; its operations rebroadcast unchanged
    FastForward { new_hash: String, broadcast: Vec<Op> },
    /// The client was behind; the delta from the previous server content
    /// is rebroadcast (empty when the merge changed nothing)
    Merged { new_hash: String, broadcast: Vec<Op> },
    /// `base_hash` is not in the store; the client must reload
    UnknownBase,
    /// Reconciliation failed; nothing was committed
    Conflict { message: String },
}

/// Process one sync request.
///
/// Callers must serialize invocations per note (see [`Room`](crate::Room)).
pub fn process_sync(store: &mut VersionStore, base_hash: &str, operations: &[Op]) -> SyncOutcome {
    let Some(base_content) = store.content_at(base_hash) else {
        return SyncOutcome::UnknownBase;
    };

    if store.head() == Some(base_hash) {
        // Fast-forward: the ops apply to HEAD exactly as authored.
        let client_content = match apply(&base_content, operations) {
            Ok(content) => content,
            Err(err) => {
                return SyncOutcome::Conflict {
                    message: err.to_string(),
                }
            }
        };
        let new_hash = store.commit(&client_content, FAST_FORWARD_MESSAGE);
        return SyncOutcome::FastForward {
            new_hash,
            broadcast: operations.to_vec(),
        };
    }

    // Three-way merge: rebase the client's intent over what the server
    // accepted since the client's base.
    let Some(server_content) = store.head_content() else {
        return SyncOutcome::Conflict {
            message: "no server content at HEAD".to_string(),
        };
    };

    let merged_content = (|| {
        let client_content = apply(&base_content, operations)?;
        let server_ops = ops_from_diff(&diff(&base_content, &server_content));
        let client_ops = ops_from_diff(&diff(&base_content, &client_content));
        let rebased = transform(&client_ops, &server_ops);
        apply(&server_content, &rebased)
    })();

    let merged_content = match merged_content {
        Ok(content) => content,
        Err(err) => {
            return SyncOutcome::Conflict {
                message: err.to_string(),
            }
        }
    };

    let new_hash = store.commit(&merged_content, MERGE_MESSAGE);
    let broadcast = ops_from_diff(&diff(&server_content, &merged_content));
    SyncOutcome::Merged {
        new_hash,
        broadcast,
    }
}
