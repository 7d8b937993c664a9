use crate::bm25;
use crate::error::{Result, SearchError};
use sift_vector_store::{ScoredDocument, VectorStore};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 5;

/// Dense candidates fetched per requested result when re-ranking
pub const OVERSAMPLE_FACTOR: usize = 2;

/// A single hybrid query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub rerank: bool,
}

impl SearchRequest {
    /// Query with the default `top_k` (5) and re-ranking enabled
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            rerank: true,
        }
    }

    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }
}

/// Two-stage retrieval: oversampled dense search, then BM25 re-ranking of the
/// dense candidates.
///
/// Holds no per-query state; concurrent searches share only the store handle.
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn VectorStore>,
    dense_timeout: Option<Duration>,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            dense_timeout: None,
        }
    }

    /// Bound every dense-store call by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.dense_timeout = Some(timeout);
        self
    }

    pub async fn search_request(&self, request: &SearchRequest) -> Result<Vec<ScoredDocument>> {
        self.search(&request.query, request.top_k, request.rerank)
            .await
    }

    /// Search with `top_k` results.
    ///
    /// With `rerank`, `2 * top_k` dense candidates are re-scored with BM25 and
    /// the best `top_k` returned with their lexical scores. Without it, exactly
    /// `top_k` dense results come back untouched.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        rerank: bool,
    ) -> Result<Vec<ScoredDocument>> {
        if top_k == 0 {
            return Err(SearchError::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }

        log::debug!(
            "Hybrid search: query='{}', top_k={}, rerank={}",
            query,
            top_k,
            rerank
        );

        if !rerank {
            let mut results = self.dense(query, top_k).await?;
            results.truncate(top_k);
            log::debug!("Dense-only search returned {} results", results.len());
            return Ok(results);
        }

        let pool = top_k.checked_mul(OVERSAMPLE_FACTOR).ok_or_else(|| {
            SearchError::InvalidArgument(format!("top_k {top_k} is too large to oversample"))
        })?;

        let candidates = self.dense(query, pool).await?;
        log::debug!("Dense: {} candidates (requested {})", candidates.len(), pool);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents = candidates.into_iter().map(|c| c.document).collect();
        let ranked = bm25::rerank(query, documents, top_k)?;

        log::info!("Hybrid search completed: {} final results", ranked.len());
        Ok(ranked)
    }

    async fn dense(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let call = self.store.similarity_search_with_score(query, k);
        match self.dense_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| SearchError::Timeout(limit))?
                .map_err(Into::into),
            None => call.await.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use sift_vector_store::{
        Document, HashingEmbedder, InMemoryVectorStore, VectorStoreError,
    };
    use std::sync::Mutex;

    /// Returns the first `k` of a fixed candidate list and records every `k`
    struct FixedStore {
        results: Vec<ScoredDocument>,
        requested: Mutex<Vec<usize>>,
    }

    impl FixedStore {
        fn new(results: Vec<ScoredDocument>) -> Arc<Self> {
            Arc::new(Self {
                results,
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<usize> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn add_documents(&self, _documents: Vec<Document>) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn similarity_search_with_score(
            &self,
            _query: &str,
            k: usize,
        ) -> sift_vector_store::Result<Vec<ScoredDocument>> {
            self.requested.lock().unwrap().push(k);
            Ok(self.results.iter().take(k).cloned().collect())
        }

        async fn remove_by_prefixes(&self, _prefixes: &[String]) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn len(&self) -> usize {
            self.results.len()
        }
    }

    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn add_documents(&self, _documents: Vec<Document>) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn similarity_search_with_score(
            &self,
            _query: &str,
            _k: usize,
        ) -> sift_vector_store::Result<Vec<ScoredDocument>> {
            Err(VectorStoreError::configuration("missing connection string"))
        }

        async fn remove_by_prefixes(&self, _prefixes: &[String]) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn len(&self) -> usize {
            0
        }
    }

    struct SlowStore;

    #[async_trait]
    impl VectorStore for SlowStore {
        async fn add_documents(&self, _documents: Vec<Document>) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn similarity_search_with_score(
            &self,
            _query: &str,
            _k: usize,
        ) -> sift_vector_store::Result<Vec<ScoredDocument>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn remove_by_prefixes(&self, _prefixes: &[String]) -> sift_vector_store::Result<usize> {
            Ok(0)
        }

        async fn len(&self) -> usize {
            0
        }
    }

    fn scored(id: &str, text: &str, score: f32) -> ScoredDocument {
        ScoredDocument::new(Document::new(text).with_id(id), score)
    }

    fn ids(results: &[ScoredDocument]) -> Vec<&str> {
        results.iter().map(|r| r.document.id.as_str()).collect()
    }

    fn vector_db_store() -> Arc<FixedStore> {
        FixedStore::new(vec![
            scored("d1", "MongoDB Atlas is a managed database", 0.91),
            scored("d2", "Vector databases enable semantic search", 0.87),
            scored("d3", "LangChain builds LLM apps", 0.42),
        ])
    }

    #[tokio::test]
    async fn rerank_promotes_lexical_match() {
        let store = vector_db_store();
        let retriever = HybridRetriever::new(store.clone());

        let results = retriever.search("vector database", 2, true).await.unwrap();

        assert_eq!(ids(&results), vec!["d2", "d1"]);
        assert_eq!(store.requested(), vec![4]);
    }

    #[tokio::test]
    async fn rerank_discards_dense_scores() {
        let retriever = HybridRetriever::new(vector_db_store());
        let results = retriever.search("vector database", 3, true).await.unwrap();

        assert_eq!(ids(&results), vec!["d2", "d1", "d3"]);
        assert_eq!(results[2].score, 0.0);
        assert_ne!(results[0].score, 0.87);
    }

    #[tokio::test]
    async fn single_candidate_with_large_top_k() {
        let store = FixedStore::new(vec![scored("only", "one lonely document", 0.5)]);
        let retriever = HybridRetriever::new(store.clone());

        let results = retriever.search("document", 5, true).await.unwrap();

        assert_eq!(ids(&results), vec!["only"]);
        assert_eq!(store.requested(), vec![10]);
    }

    #[tokio::test]
    async fn symbol_only_candidate_is_not_lost() {
        let store = FixedStore::new(vec![
            scored("symbols", "★ → ©", 0.9),
            scored("v", "vector", 0.8),
        ]);
        let retriever = HybridRetriever::new(store);

        let results = retriever.search("vector", 2, true).await.unwrap();

        assert_eq!(ids(&results), vec!["v", "symbols"]);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_in_both_modes() {
        let retriever = HybridRetriever::new(FixedStore::new(Vec::new()));

        assert!(retriever.search("q", 3, true).await.unwrap().is_empty());
        assert!(retriever.search("q", 3, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected_before_the_store_is_called() {
        let store = vector_db_store();
        let retriever = HybridRetriever::new(store.clone());

        for rerank in [true, false] {
            let err = retriever.search("q", 0, rerank).await.unwrap_err();
            assert!(matches!(err, SearchError::InvalidArgument(_)));
        }
        assert!(store.requested().is_empty());
    }

    #[tokio::test]
    async fn oversampling_overflow_is_rejected() {
        let retriever = HybridRetriever::new(vector_db_store());
        let err = retriever.search("q", usize::MAX, true).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn passthrough_keeps_dense_order_and_scores() {
        let store = vector_db_store();
        let retriever = HybridRetriever::new(store.clone());

        let results = retriever.search("vector database", 2, false).await.unwrap();

        assert_eq!(ids(&results), vec!["d1", "d2"]);
        assert_eq!(results[0].score, 0.91);
        assert_eq!(results[1].score, 0.87);
        assert_eq!(store.requested(), vec![2]);
    }

    #[tokio::test]
    async fn empty_query_is_forwarded_and_keeps_dense_order() {
        let store = vector_db_store();
        let retriever = HybridRetriever::new(store.clone());

        let results = retriever.search("", 3, true).await.unwrap();

        assert_eq!(ids(&results), vec!["d1", "d2", "d3"]);
        assert!(results.iter().all(|r| r.score == 0.0));
        assert_eq!(store.requested(), vec![6]);
    }

    #[tokio::test]
    async fn store_errors_propagate_unchanged() {
        let retriever = HybridRetriever::new(Arc::new(FailingStore));

        for rerank in [true, false] {
            let err = retriever.search("q", 2, rerank).await.unwrap_err();
            assert!(matches!(
                err,
                SearchError::VectorStoreError(VectorStoreError::Configuration(_))
            ));
            assert_eq!(err.to_string(), "Configuration error: missing connection string");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dense_timeout_is_enforced() {
        let retriever =
            HybridRetriever::new(Arc::new(SlowStore)).with_timeout(Duration::from_millis(50));

        let err = retriever.search("q", 2, true).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn request_defaults() {
        let request = SearchRequest::new("vector database");
        assert_eq!(request.top_k, DEFAULT_TOP_K);
        assert!(request.rerank);

        let store = vector_db_store();
        let retriever = HybridRetriever::new(store.clone());
        let results = retriever
            .search_request(&request.clone().rerank(false).top_k(1))
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["d1"]);

        retriever.search_request(&request).await.unwrap();
        assert_eq!(store.requested(), vec![1, 10]);
    }

    #[tokio::test]
    async fn works_over_in_memory_store() {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(256))));
        store
            .add_documents(vec![
                Document::new("MongoDB Atlas is a managed database").with_id("d1"),
                Document::new("Vector databases enable semantic search").with_id("d2"),
                Document::new("LangChain builds LLM apps").with_id("d3"),
            ])
            .await
            .unwrap();
        let retriever = HybridRetriever::new(store);

        let results = retriever.search("vector database", 2, true).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "d2");
    }

    #[tokio::test]
    async fn concurrent_searches_are_independent() {
        let retriever = HybridRetriever::new(vector_db_store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let retriever = retriever.clone();
                tokio::spawn(async move { retriever.search("vector database", 2, true).await })
            })
            .collect();

        for handle in handles {
            let results = handle.await.unwrap().unwrap();
            assert_eq!(ids(&results), vec!["d2", "d1"]);
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #[test]
        fn output_is_bounded_and_drawn_from_candidates(
            texts in proptest::collection::vec("[a-e]{1,6}( [a-e]{1,6}){0,5}", 0..16),
            query in "[a-e ]{0,10}",
            top_k in 1usize..10,
            rerank in any::<bool>(),
        ) {
            let results: Vec<ScoredDocument> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| scored(&i.to_string(), t, 1.0 - i as f32 / 100.0))
                .collect();
            let store = FixedStore::new(results.clone());
            let retriever = HybridRetriever::new(store.clone());

            let output = block_on(retriever.search(&query, top_k, rerank)).unwrap();

            prop_assert_eq!(output.len(), top_k.min(texts.len()));
            let requested = store.requested();
            prop_assert_eq!(requested.len(), 1);
            let pool: Vec<&ScoredDocument> = results.iter().take(requested[0]).collect();
            for item in &output {
                prop_assert!(pool.iter().any(|c| c.document == item.document));
            }
            if !rerank {
                prop_assert_eq!(&output[..], &results[..output.len()]);
            }
        }
    }
}
