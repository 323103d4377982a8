//! # Notewell History
//!
//! Content-addressed version history for a note.

pub mod object;
pub mod store;

pub use object::{sha1_hex, Commit};
pub use store::{VersionStore, NOTE_FILENAME};
