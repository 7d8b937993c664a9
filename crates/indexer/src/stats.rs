use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Pages handed to the indexer
    pub pages_seen: usize,

    /// Pages with no text
    pub empty: usize,

    /// Pages below the word-count threshold
    pub too_short: usize,

    /// Pages whose text was already seen
    pub duplicates: usize,

    /// Documents (chunks) produced
    pub documents: usize,

    /// Documents produced by each chunker, keyed by its label
    #[serde(default)]
    pub per_chunker: BTreeMap<String, usize>,
}

impl IndexStats {
    pub fn pages_kept(&self) -> usize {
        self.pages_seen - self.empty - self.too_short - self.duplicates
    }
}
