use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sift_indexer::IndexerConfig;
use sift_search::DEFAULT_TOP_K;
use sift_vector_store::StoreConfig;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sift.toml";

/// Search defaults, overridable per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub rerank: bool,
    /// Upper bound for the dense-store call
    pub timeout_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            rerank: true,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub indexer: IndexerConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config")
    }

    /// Load `explicit`, else `./sift.toml` when present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.is_file().then_some(fallback)
            }
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        log::debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.indexer.validate()?;
        anyhow::ensure!(self.search.top_k > 0, "search.top_k must be greater than zero");
        Ok(())
    }
}
