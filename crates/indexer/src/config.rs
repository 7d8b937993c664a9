use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use sift_vector_store::Metadata;
use std::collections::HashSet;

/// One chunking strategy: overlapping windows of `words` words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    /// Words per chunk
    pub words: usize,

    /// Words shared between consecutive chunks
    #[serde(default)]
    pub overlap: usize,

    /// Label stored as `chunker` metadata and in document ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChunkSpec {
    pub fn new(words: usize, overlap: usize) -> Self {
        Self {
            words,
            overlap,
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("w{}o{}", self.words, self.overlap),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.words == 0 {
            return Err(IndexerError::InvalidConfig(
                "chunker words must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.words {
            return Err(IndexerError::InvalidConfig(format!(
                "chunker overlap ({}) must be smaller than words ({})",
                self.overlap, self.words
            )));
        }
        let label = self.label();
        if label.is_empty() || label.contains(':') {
            return Err(IndexerError::InvalidConfig(format!(
                "chunker name '{label}' must be non-empty and must not contain ':'"
            )));
        }
        Ok(())
    }
}

impl Default for ChunkSpec {
    fn default() -> Self {
        Self::new(256, 32)
    }
}

/// Configuration for turning crawled pages into indexed documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Root URL the pages were crawled from
    pub website: Option<String>,

    /// Extra metadata attached to every document; overrides page metadata
    pub metadata: Metadata,

    /// Pages with fewer whitespace-separated words are skipped
    pub word_count_threshold: usize,

    /// Chunking strategies; every page is chunked by each of them
    pub chunkers: Vec<ChunkSpec>,

    /// Documents per `add_documents` call
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            website: None,
            metadata: Metadata::new(),
            word_count_threshold: 200,
            chunkers: vec![ChunkSpec::default()],
            batch_size: 64,
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunkers.is_empty() {
            return Err(IndexerError::InvalidConfig(
                "at least one chunker is required".to_string(),
            ));
        }
        let mut labels = HashSet::new();
        for chunker in &self.chunkers {
            chunker.validate()?;
            if !labels.insert(chunker.label()) {
                return Err(IndexerError::InvalidConfig(format!(
                    "duplicate chunker '{}'",
                    chunker.label()
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(IndexerError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
