use crate::chunker::{chunk_words, word_count};
use crate::config::IndexerConfig;
use crate::dedup::{hash_content, ContentDeduplicator};
use crate::error::Result;
use crate::page::CrawledPage;
use crate::stats::IndexStats;
use sift_vector_store::{Document, Metadata, VectorStore};

/// Documents ready for the store, plus what was filtered on the way
#[derive(Debug, Clone, Default)]
pub struct PreparedDocuments {
    pub documents: Vec<Document>,
    pub stats: IndexStats,
    /// Content hashes of the kept pages; every document id starts with `<hash>:`
    pub page_hashes: Vec<String>,
}

/// Cleans, deduplicates and chunks crawled pages, then feeds them to a store
pub struct PageIndexer {
    config: IndexerConfig,
    parsing_date: String,
}

impl PageIndexer {
    pub fn new(config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parsing_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        })
    }

    /// Override the `parsing_date` stamped on documents
    #[must_use]
    pub fn with_parsing_date(mut self, date: impl Into<String>) -> Self {
        self.parsing_date = date.into();
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn prepare(&self, pages: Vec<CrawledPage>) -> PreparedDocuments {
        let mut stats = IndexStats::default();
        let mut dedup = ContentDeduplicator::new();
        let mut documents = Vec::new();
        let mut page_hashes = Vec::new();

        for page in pages {
            stats.pages_seen += 1;

            let text = page.markdown.trim();
            if text.is_empty() {
                log::warn!("Empty text skipped: {}", page.url);
                stats.empty += 1;
                continue;
            }

            let words = word_count(text);
            if words < self.config.word_count_threshold {
                log::debug!(
                    "Short page skipped: {} ({} < {} words)",
                    page.url,
                    words,
                    self.config.word_count_threshold
                );
                stats.too_short += 1;
                continue;
            }

            let hash = hash_content(text);
            if !dedup.insert(&hash) {
                log::info!("Duplicate content skipped: {}", page.url);
                stats.duplicates += 1;
                continue;
            }

            let metadata = self.page_metadata(&page);
            for chunker in &self.config.chunkers {
                let label = chunker.label();
                let chunks = chunk_words(text, chunker.words, chunker.overlap);
                *stats.per_chunker.entry(label.clone()).or_insert(0) += chunks.len();
                for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                    let mut document =
                        Document::new(chunk).with_id(format!("{hash}:{label}:{chunk_index}"));
                    document.metadata = metadata.clone();
                    document
                        .metadata
                        .insert("chunker".to_string(), label.clone().into());
                    document
                        .metadata
                        .insert("chunk_index".to_string(), chunk_index.into());
                    documents.push(document);
                }
            }
            page_hashes.push(hash);
        }

        for (label, count) in &stats.per_chunker {
            log::info!("Chunker {}: {} chunks", label, count);
        }
        stats.documents = documents.len();
        log::info!(
            "Prepared {} documents from {} pages ({} empty, {} short, {} duplicate)",
            stats.documents,
            stats.pages_seen,
            stats.empty,
            stats.too_short,
            stats.duplicates
        );

        PreparedDocuments {
            documents,
            stats,
            page_hashes,
        }
    }

    /// Prepare `pages` and add the resulting documents in batches.
    ///
    /// Chunks stored for a page by an earlier run are removed first, so
    /// re-indexing with different chunkers leaves no stale windows behind.
    pub async fn index(
        &self,
        store: &dyn VectorStore,
        pages: Vec<CrawledPage>,
    ) -> Result<IndexStats> {
        let PreparedDocuments {
            documents,
            stats,
            page_hashes,
        } = self.prepare(pages);

        let prefixes: Vec<String> = page_hashes.iter().map(|hash| format!("{hash}:")).collect();
        let replaced = store.remove_by_prefixes(&prefixes).await?;
        if replaced > 0 {
            log::info!("Removed {} chunks from earlier runs", replaced);
        }

        for batch in documents.chunks(self.config.batch_size) {
            let added = store.add_documents(batch.to_vec()).await?;
            log::debug!("Indexed batch of {}", added);
        }

        log::info!("Indexed {} documents", stats.documents);
        Ok(stats)
    }

    fn page_metadata(&self, page: &CrawledPage) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), page.url.clone().into());
        metadata.insert("depth".to_string(), page.depth.into());
        if let Some(website) = &self.config.website {
            metadata.insert("website".to_string(), website.clone().into());
        }
        metadata.insert("parsing_date".to_string(), self.parsing_date.clone().into());
        metadata.extend(page.metadata.clone());
        metadata.extend(self.config.metadata.clone());
        metadata
    }
}
