use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    VectorStoreError(#[from] sift_vector_store::VectorStoreError),

    #[error("Invalid indexer configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid page on line {line}: {source}")]
    InvalidPage {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
