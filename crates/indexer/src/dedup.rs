use sift_vector_store::content_hash;
use std::collections::HashSet;

/// SHA-256 of the trimmed text, so whitespace-only differences collapse
pub fn hash_content(text: &str) -> String {
    content_hash(text.trim())
}

/// Remembers content hashes; the first occurrence of a text wins
#[derive(Debug, Default)]
pub struct ContentDeduplicator {
    seen: HashSet<String>,
}

impl ContentDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash`; `false` if it was already seen
    pub fn insert(&mut self, hash: &str) -> bool {
        if self.seen.contains(hash) {
            return false;
        }
        self.seen.insert(hash.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
