//! # Sift Vector Store
//!
//! Document model, embedding providers and dense similarity search.
//!
//! ## Features
//!
//! - **`VectorStore` capability** with explicit backend construction
//! - **Pluggable embeddings**: offline feature hashing or an OpenAI-compatible endpoint
//! - **Persistent storage** with versioned JSON snapshots
//! - **Eager configuration validation** before any backend is built
//!
//! ## Architecture
//!
//! ```text
//! Document[]
//!     │
//!     ├──> Embedder (hashing | openai)
//!     │      └─> Vector[dimension]
//!     │
//!     ├──> FlatIndex
//!     │      └─> Exhaustive cosine search
//!     │
//!     └──> JSON snapshot
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sift_vector_store::{Document, InMemoryVectorStore, StoreConfig, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> sift_vector_store::Result<()> {
//!     let store = InMemoryVectorStore::open(&StoreConfig::default()).await?;
//!
//!     store
//!         .add_documents(vec![Document::new("Vector databases enable semantic search")])
//!         .await?;
//!
//!     for result in store.similarity_search_with_score("vector search", 5).await? {
//!         println!("{}: {:.3}", result.document.id, result.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod embeddings;
mod error;
mod flat_index;
mod store;
mod types;

pub use config::{EmbeddingConfig, StoreConfig, DEFAULT_STORE_PATH};
pub use embeddings::{build_embedder, cosine_similarity, Embedder, HashingEmbedder, OpenAiEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use store::{InMemoryVectorStore, VectorStore, STORE_SCHEMA_VERSION};
pub use types::{content_hash, Document, Metadata, ScoredDocument, StoredDocument};
