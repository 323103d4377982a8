//! Multi-client convergence over the in-process room.
//!
//! After all frames are delivered, every editor must render the content
//! at the server's HEAD.

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use notewell_collab::protocol::ServerMessage;
use notewell_collab::sync::NoteSync;
use notewell_server::room::{ConnId, Room, Rooms};

struct SimClient {
    conn: ConnId,
    rx: UnboundedReceiver<ServerMessage>,
    sync: NoteSync,
}

impl SimClient {
    fn join(rooms: &Rooms, note_id: &str) -> (Arc<Room>, Self) {
        let conn = ConnId::new();
        let (tx, rx) = unbounded_channel();
        let room = rooms.join(note_id, conn, tx);
        let snapshot = room.snapshot();
        let sync = NoteSync::new(
            snapshot.latest_hash.expect("room has an initial commit"),
            snapshot.latest_content.unwrap_or_default(),
        );
        (room, Self { conn, rx, sync })
    }

    /// Type into the editor; a debounced client would send this after the
    /// quiet period, so the sync goes straight to the room.
    fn edit(&mut self, room: &Room, text: &str) {
        if let Some(request) = self.sync.local_edit(text).expect("local edit applies") {
            room.process_sync(self.conn, &request.base_hash, &request.operations);
        }
    }

    /// Deliver every queued frame; follow-up syncs go back to the room.
    /// Returns true if any frame was processed.
    fn pump(&mut self, room: &Room) -> bool {
        let mut progressed = false;
        while let Ok(msg) = self.rx.try_recv() {
            progressed = true;
            match msg {
                ServerMessage::Ack { new_hash } => {
                    if let Some(request) = self.sync.handle_ack(&new_hash).expect("ack applies") {
                        room.process_sync(self.conn, &request.base_hash, &request.operations);
                    }
                }
                ServerMessage::Update {
                    latest_hash,
                    operations,
                } => {
                    self.sync
                        .handle_update(&latest_hash, &operations)
                        .expect("update applies");
                }
                ServerMessage::UserCountUpdate { .. } => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
        progressed
    }

    fn rendered(&self) -> String {
        self.sync.rendered().expect("rendered text")
    }
}

/// Deliver frames in rounds until every queue drains
fn settle(room: &Room, clients: &mut [&mut SimClient]) {
    loop {
        let mut progressed = false;
        for client in clients.iter_mut() {
            progressed |= client.pump(room);
        }
        if !progressed {
            break;
        }
    }
}

fn assert_converged(room: &Room, clients: &[&SimClient]) {
    // A client that authored an edit the merge reduced to nothing keeps an
    // older hash whose content equals HEAD, so only text is compared.
    let server = room
        .snapshot()
        .latest_content
        .expect("server content at HEAD");
    for client in clients {
        assert_eq!(client.rendered(), server, "client diverged from HEAD");
    }
}

#[test]
fn fast_forward_reaches_every_editor() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");

    a.edit(&room, "hello");
    settle(&room, &mut [&mut a, &mut b]);

    assert_eq!(room.snapshot().latest_content.as_deref(), Some("hello"));
    assert_converged(&room, &[&a, &b]);
}

#[test]
fn concurrent_same_position_inserts_converge() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");

    // Seed "ab" and let everyone catch up.
    a.edit(&room, "ab");
    settle(&room, &mut [&mut a, &mut b]);

    // Both editors insert at position 1 before seeing each other's edit.
    a.edit(&room, "aXb");
    b.edit(&room, "aYb");
    settle(&room, &mut [&mut a, &mut b]);

    assert_eq!(room.snapshot().latest_content.as_deref(), Some("aXYb"));
    assert_converged(&room, &[&a, &b]);
}

#[test]
fn concurrent_delete_and_append_converge() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");

    a.edit(&room, "hello");
    settle(&room, &mut [&mut a, &mut b]);

    a.edit(&room, "ello");
    b.edit(&room, "hello!");
    settle(&room, &mut [&mut a, &mut b]);

    assert_eq!(room.snapshot().latest_content.as_deref(), Some("ello!"));
    assert_converged(&room, &[&a, &b]);
}

#[test]
fn duplicate_deletes_converge_without_overdeleting() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");

    a.edit(&room, "ab");
    settle(&room, &mut [&mut a, &mut b]);

    a.edit(&room, "b");
    b.edit(&room, "b");
    settle(&room, &mut [&mut a, &mut b]);

    assert_eq!(room.snapshot().latest_content.as_deref(), Some("b"));
    assert_converged(&room, &[&a, &b]);
}

#[test]
fn pending_edits_survive_a_remote_update() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");

    a.edit(&room, "base");
    settle(&room, &mut [&mut a, &mut b]);

    // B stacks two local edits: the second queues as pending behind the
    // in-flight first. A commits its own edit before B's ack lands.
    b.edit(&room, "Xbase");
    b.edit(&room, "XbaseZ");
    a.edit(&room, "baseY");

    settle(&room, &mut [&mut a, &mut b]);
    assert_converged(&room, &[&a, &b]);

    let server = room.snapshot().latest_content.unwrap();
    assert!(server.contains('X'), "B's first edit survived: {server:?}");
    assert!(server.contains('Z'), "B's pending edit survived: {server:?}");
    assert!(server.contains('Y'), "A's edit survived: {server:?}");
}

#[test]
fn three_editors_interleaving_still_converge() {
    let rooms = Rooms::new();
    let (room, mut a) = SimClient::join(&rooms, "pad");
    let (_, mut b) = SimClient::join(&rooms, "pad");
    let (_, mut c) = SimClient::join(&rooms, "pad");

    a.edit(&room, "shared");
    settle(&room, &mut [&mut a, &mut b, &mut c]);

    // Divergent edits from the same base, delivered in arrival order.
    a.edit(&room, "shared one");
    b.edit(&room, "Shared");
    c.edit(&room, "shard");
    settle(&room, &mut [&mut a, &mut b, &mut c]);

    assert_converged(&room, &[&a, &b, &c]);
}
