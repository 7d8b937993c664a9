//! Hybrid retrieval: dense candidates from a [`VectorStore`](sift_vector_store::VectorStore),
//! re-ranked by a per-query BM25 model.

mod bm25;
mod error;
mod hybrid;
mod tokenizer;

pub use bm25::{rerank, LexicalScorer, BM25_B, BM25_K1};
pub use error::{Result, SearchError};
pub use hybrid::{HybridRetriever, SearchRequest, DEFAULT_TOP_K, OVERSAMPLE_FACTOR};
pub use tokenizer::tokenize;
