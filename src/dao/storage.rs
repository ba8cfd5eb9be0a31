use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Targeted document does not exist (only raised by operations that require it).
    #[error("document `{id}` not found in collection `{collection}`")]
    NotFound { collection: String, id: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a not-found error for the given collection and document id.
    pub fn not_found(collection: &str, id: &str) -> Self {
        StorageError::NotFound {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }
    }
}
