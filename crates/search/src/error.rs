use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    VectorStoreError(#[from] sift_vector_store::VectorStoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dense search timed out after {0:?}")]
    Timeout(Duration),
}
