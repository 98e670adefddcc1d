use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage medium could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Bytes were read but they are not something we wrote.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("could not serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Errors that say nothing about whether the stored bytes are intact.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::QuotaExceeded
        )
    }
}
