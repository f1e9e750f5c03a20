use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync engine is not accepting connections")]
    EngineUnavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
