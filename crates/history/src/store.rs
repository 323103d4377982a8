//! In-memory content-addressed store for one note's history.

use std::collections::HashMap;

use crate::object::{sha1_hex, tree_hash, Commit, Tree};

/// Filename under which a note's content is recorded in its tree
pub const NOTE_FILENAME: &str = "note.txt";

#[derive(Debug, Clone)]
enum Object {
    Blob(String),
    Tree(Tree),
    Commit(Commit),
}

/// Append-only commit chain addressed by content.
///
/// Objects are immutable and never garbage-collected; merges need
/// arbitrary historical base contents.
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    objects: HashMap<String, Object>,
    head: Option<String>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `content` as a new commit advancing HEAD; returns its hash
    pub fn commit(&mut self, content: &str, message: &str) -> String {
        self.commit_at(content, message, chrono::Utc::now().timestamp_millis())
    }

    /// Commit with an explicit timestamp; identical inputs hash identically
    pub fn commit_at(&mut self, content: &str, message: &str, timestamp: i64) -> String {
        let blob_hash = sha1_hex(content.as_bytes());
        self.put(blob_hash.clone(), Object::Blob(content.to_string()));

        let mut tree = Tree::new();
        tree.insert(NOTE_FILENAME.to_string(), blob_hash);
        let tree_hash = tree_hash(&tree);
        self.put(tree_hash.clone(), Object::Tree(tree));

        let commit = Commit {
            tree: tree_hash,
            parent: self.head.clone(),
            message: message.to_string(),
            timestamp,
        };
        let commit_hash = commit.hash();
        self.put(commit_hash.clone(), Object::Commit(commit));
        self.head = Some(commit_hash.clone());
        commit_hash
    }

    /// Resolve a commit hash to the note content it recorded
    pub fn content_at(&self, hash: &str) -> Option<String> {
        let commit = match self.objects.get(hash)? {
            Object::Commit(commit) => commit,
            _ => return None,
        };
        let tree = match self.objects.get(&commit.tree)? {
            Object::Tree(tree) => tree,
            _ => return None,
        };
        let blob_hash = tree.values().next()?;
        match self.objects.get(blob_hash)? {
            Object::Blob(content) => Some(content.clone()),
            _ => None,
        }
    }

    /// Current authoritative commit hash, `None` before the first commit
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Content at HEAD
    pub fn head_content(&self) -> Option<String> {
        self.head().and_then(|hash| self.content_at(hash))
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.objects.contains_key(hash)
    }

    /// Number of stored objects (blobs, trees, and commits)
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn put(&mut self, hash: String, object: Object) {
        self.objects.entry(hash).or_insert(object);
    }
}
