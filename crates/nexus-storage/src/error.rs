//! Storage error types.

/// Errors from state providers.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage backend could not be reached or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data exists but cannot be decoded.
    #[error("corrupt state: {0}")]
    Corrupt(String),

    /// Data could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key is not usable with this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
