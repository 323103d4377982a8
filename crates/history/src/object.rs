//! Content-addressed objects and their canonical serialization.
//!
//! Blobs hash as raw UTF-8 bytes, trees as key-sorted JSON, commits as
//! JSON in declared field order; changing any of these breaks every
//! stored address.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// SHA-1 hex digest of raw bytes
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Snapshot-with-parent commit; field order is the canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Hash of the tree this commit snapshots
    pub tree: String,
    /// Previous commit hash; `None` for the root commit
    pub parent: Option<String>,
    pub message: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl Commit {
    /// Canonical JSON serialization, the byte sequence that is hashed
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).expect("commit serializes to JSON")
    }

    pub fn hash(&self) -> String {
        sha1_hex(self.canonical().as_bytes())
    }
}

/// One-entry filename-to-blob mapping
pub type Tree = BTreeMap<String, String>;

/// Canonical serialization of a tree: key-sorted JSON object
pub fn tree_canonical(tree: &Tree) -> String {
    serde_json::to_string(tree).expect("tree serializes to JSON")
}

pub fn tree_hash(tree: &Tree) -> String {
    sha1_hex(tree_canonical(tree).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_hash_is_sha1_of_raw_bytes() {
        // Well-known SHA-1 test vector
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn commit_canonical_form_is_field_ordered() {
        let commit = Commit {
            tree: "t".into(),
            parent: None,
            message: "m".into(),
            timestamp: 7,
        };
        assert_eq!(
            commit.canonical(),
            r#"{"tree":"t","parent":null,"message":"m","timestamp":7}"#
        );
    }

    #[test]
    fn identical_commits_hash_identically() {
        let make = || Commit {
            tree: "t".into(),
            parent: Some("p".into()),
            message: "update".into(),
            timestamp: 42,
        };
        assert_eq!(make().hash(), make().hash());
    }

    #[test]
    fn commit_hash_depends_on_every_field() {
        let base = Commit {
            tree: "t".into(),
            parent: None,
            message: "m".into(),
            timestamp: 1,
        };
        let mut other = base.clone();
        other.timestamp = 2;
        assert_ne!(base.hash(), other.hash());

        let mut other = base.clone();
        other.parent = Some("p".into());
        assert_ne!(base.hash(), other.hash());
    }

    #[test]
    fn tree_serialization_is_deterministic() {
        let mut tree = Tree::new();
        tree.insert("note.txt".into(), "abc".into());
        assert_eq!(tree_canonical(&tree), r#"{"note.txt":"abc"}"#);
    }
}
