use hsync_store::StoreError;
use hsync_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Bad request shape or a handle that does not decode. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing store failed or returned something unusable.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl DirectoryError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<TypeError> for DirectoryError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
