use crate::config::StoreConfig;
use crate::embeddings::{build_embedder, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::types::{Document, ScoredDocument, StoredDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const STORE_SCHEMA_VERSION: u32 = 1;

/// Dense similarity search capability.
///
/// Backends are chosen by explicit construction; callers only see this trait.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents. A document whose id already exists replaces it.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize>;

    /// Top-`k` nearest neighbours of `query`, best match first
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>>;

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_score(query, k)
            .await?
            .into_iter()
            .map(|scored| scored.document)
            .collect())
    }

    /// Remove every document whose id starts with one of `prefixes`
    async fn remove_by_prefixes(&self, prefixes: &[String]) -> Result<usize>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct Inner {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
    index: FlatIndex,
}

impl Inner {
    fn new(dimension: usize) -> Self {
        Self {
            documents: Vec::new(),
            positions: HashMap::new(),
            index: FlatIndex::new(dimension),
        }
    }

    fn upsert(&mut self, document: Document, vector: Vec<f32>) -> Result<()> {
        if let Some(&position) = self.positions.get(&document.id) {
            self.index.replace(position, vector)?;
            self.documents[position] = document;
        } else {
            let position = self.index.push(vector)?;
            self.positions.insert(document.id.clone(), position);
            self.documents.push(document);
        }
        Ok(())
    }

    /// Keep only documents matching `keep`; positions are compacted in order
    fn retain(&mut self, keep: impl Fn(&Document) -> bool) -> Result<usize> {
        if self.documents.iter().all(&keep) {
            return Ok(0);
        }

        let mut rebuilt = Inner::new(self.index.dimension());
        for (position, document) in self.documents.iter().enumerate() {
            if !keep(document) {
                continue;
            }
            let vector = self.index.get(position).ok_or_else(|| {
                VectorStoreError::Other(format!("missing vector for '{}'", document.id))
            })?;
            rebuilt.upsert(document.clone(), vector.to_vec())?;
        }

        let removed = self.documents.len() - rebuilt.documents.len();
        *self = rebuilt;
        Ok(removed)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    schema_version: u32,
    dimension: usize,
    documents: Vec<StoredDocument>,
}

/// Brute-force cosine store kept in memory, persisted as JSON on demand
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self {
            embedder,
            inner: RwLock::new(Inner::new(dimension)),
        }
    }

    /// Build the configured embedder and load `config.path` if it exists
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let embedder = build_embedder(&config.embedding)?;
        if tokio::fs::try_exists(&config.path).await? {
            Self::load(&config.path, embedder).await
        } else {
            log::info!("No store at {:?}, starting empty", config.path);
            Ok(Self::new(embedder))
        }
    }

    pub async fn load(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading vector store from {:?}", path);
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedStore = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != STORE_SCHEMA_VERSION {
            return Err(VectorStoreError::Other(format!(
                "Unsupported store schema_version {} (expected {STORE_SCHEMA_VERSION})",
                persisted.schema_version
            )));
        }
        if persisted.dimension != embedder.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: embedder.dimension(),
                actual: persisted.dimension,
            });
        }

        let mut inner = Inner::new(persisted.dimension);
        for stored in persisted.documents {
            inner.upsert(stored.document, stored.vector)?;
        }
        log::info!("Loaded {} documents", inner.documents.len());

        Ok(Self {
            embedder,
            inner: RwLock::new(inner),
        })
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let inner = self.inner.read().await;
            let mut documents = Vec::with_capacity(inner.documents.len());
            for (position, document) in inner.documents.iter().enumerate() {
                let vector = inner.index.get(position).ok_or_else(|| {
                    VectorStoreError::Other(format!("missing vector for '{}'", document.id))
                })?;
                documents.push(StoredDocument {
                    document: document.clone(),
                    vector: vector.to_vec(),
                });
            }
            serde_json::to_vec(&PersistedStore {
                schema_version: STORE_SCHEMA_VERSION,
                dimension: inner.index.dimension(),
                documents,
            })?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::info!("Vector store saved to {:?}", path);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        let inner = self.inner.read().await;
        inner
            .positions
            .get(id)
            .and_then(|&position| inner.documents.get(position))
            .cloned()
    }

    /// Drop every document, returning how many were removed
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.documents.len();
        inner.documents.clear();
        inner.positions.clear();
        inner.index.clear();
        removed
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        log::debug!("Embedding {} documents", documents.len());
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(VectorStoreError::embedding(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let added = documents.len();
        let mut inner = self.inner.write().await;
        for (document, vector) in documents.into_iter().zip(vectors) {
            inner.upsert(document, vector)?;
        }
        log::debug!("Store now holds {} documents", inner.documents.len());
        Ok(added)
    }

    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let inner = self.inner.read().await;
        let neighbors = inner.index.search(&query_vector, k)?;

        Ok(neighbors
            .into_iter()
            .filter_map(|(position, score)| {
                inner
                    .documents
                    .get(position)
                    .map(|document| ScoredDocument::new(document.clone(), score))
            })
            .collect())
    }

    async fn remove_by_prefixes(&self, prefixes: &[String]) -> Result<usize> {
        if prefixes.is_empty() {
            return Ok(0);
        }
        let mut inner = self.inner.write().await;
        let removed = inner.retain(|document| {
            !prefixes
                .iter()
                .any(|prefix| document.id.starts_with(prefix.as_str()))
        })?;
        if removed > 0 {
            log::debug!("Removed {} documents by id prefix", removed);
        }
        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }
}
