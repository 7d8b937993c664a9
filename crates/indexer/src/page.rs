use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use sift_vector_store::Metadata;
use std::path::Path;

/// One page as emitted by the crawler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    #[serde(alias = "text", alias = "content")]
    pub markdown: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CrawledPage {
    pub fn new(url: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markdown: markdown.into(),
            depth: 0,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Parse JSON-lines crawler output; blank lines are ignored
pub fn parse_pages(input: &str) -> Result<Vec<CrawledPage>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| IndexerError::InvalidPage {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

pub async fn read_pages(path: impl AsRef<Path>) -> Result<Vec<CrawledPage>> {
    let path = path.as_ref();
    let input = tokio::fs::read_to_string(path).await?;
    let pages = parse_pages(&input)?;
    log::info!("Read {} pages from {:?}", pages.len(), path);
    Ok(pages)
}
