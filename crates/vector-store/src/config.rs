use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_HASHING_DIMENSION: usize = 384;
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_DIMENSION: usize = 1536;
pub const DEFAULT_STORE_PATH: &str = ".sift/store.json";

/// Embedding backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    /// Offline feature-hashing embedder
    Hashing {
        #[serde(default = "default_hashing_dimension")]
        dimension: usize,
    },
    /// OpenAI-compatible `/embeddings` endpoint
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default)]
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default = "default_openai_dimension")]
        dimension: usize,
    },
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::Hashing {
            dimension: DEFAULT_HASHING_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    pub fn dimension(&self) -> usize {
        match self {
            Self::Hashing { dimension } | Self::OpenAi { dimension, .. } => *dimension,
        }
    }

    /// Reject missing or nonsensical fields before any backend is built
    pub fn validate(&self) -> Result<()> {
        if self.dimension() == 0 {
            return Err(VectorStoreError::configuration(
                "embedding dimension must be greater than zero",
            ));
        }
        if let Self::OpenAi {
            api_key,
            model,
            base_url,
            ..
        } = self
        {
            if api_key.trim().is_empty() {
                return Err(VectorStoreError::configuration(
                    "openai embedding provider requires an api_key",
                ));
            }
            if model.trim().is_empty() {
                return Err(VectorStoreError::configuration(
                    "openai embedding provider requires a model",
                ));
            }
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(VectorStoreError::configuration(format!(
                    "openai base_url must be an http(s) URL, got '{base_url}'"
                )));
            }
        }
        Ok(())
    }
}

/// Where the store lives and how it embeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(VectorStoreError::configuration("store path is empty"));
        }
        self.embedding.validate()
    }
}

fn default_hashing_dimension() -> usize {
    DEFAULT_HASHING_DIMENSION
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_openai_dimension() -> usize {
    DEFAULT_OPENAI_DIMENSION
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}
