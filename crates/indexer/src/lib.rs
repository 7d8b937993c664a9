//! # Sift Indexer
//!
//! Turns crawler output into searchable documents.
//!
//! ## Pipeline
//!
//! ```text
//! pages.jsonl
//!     │
//!     ├──> Cleaning (empty / below word threshold)
//!     │
//!     ├──> Dedup (SHA-256 of trimmed text)
//!     │
//!     ├──> Chunkers (overlapping word windows, one pass per strategy)
//!     │      └─> Documents + page metadata
//!     │
//!     └──> Vector Store (batched add)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sift_indexer::{read_pages, IndexerConfig, PageIndexer};
//! use sift_vector_store::{InMemoryVectorStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryVectorStore::open(&StoreConfig::default()).await?;
//!     let pages = read_pages("pages.jsonl").await?;
//!
//!     let stats = PageIndexer::new(IndexerConfig::default())?
//!         .index(&store, pages)
//!         .await?;
//!
//!     println!("Indexed {} documents", stats.documents);
//!     Ok(())
//! }
//! ```

mod chunker;
mod config;
mod dedup;
mod error;
mod indexer;
mod page;
mod stats;

pub use chunker::{chunk_words, word_count};
pub use config::{ChunkSpec, IndexerConfig};
pub use dedup::{hash_content, ContentDeduplicator};
pub use error::{IndexerError, Result};
pub use indexer::{PageIndexer, PreparedDocuments};
pub use page::{parse_pages, read_pages, CrawledPage};
pub use stats::IndexStats;
