//! # Notewell Server
//!
//! The authoritative side of note synchronization: per-note rooms,
//! fast-forward and three-way merges, and the HTTP/WebSocket shell.

pub mod api;
pub mod config;
pub mod merge;
pub mod room;
pub mod ws;

pub use config::ServerConfig;
pub use merge::{process_sync, SyncOutcome};
pub use room::{ConnId, NoteSnapshot, Room, Rooms};

/// Shared state handed to every transport handler
#[derive(Clone)]
pub struct AppState {
    pub rooms: Rooms,
}

/// Build the application router: note API, WebSocket upgrade, 404 fallback
pub fn router(rooms: Rooms) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/api/note/{id}", get(api::get_note).options(api::preflight))
        .route("/ws/note/{id}", get(ws::ws_note))
        .fallback(api::fallback)
        .with_state(AppState { rooms })
}
