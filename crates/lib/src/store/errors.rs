//! Error types for the storage boundary.

use thiserror::Error;

/// Errors returned by [`Storage`](super::Storage) implementations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record in the collection matches the key
    #[error("no record in '{collection}' with {key}")]
    NotFound { collection: String, key: String },

    /// A record with the key already exists
    #[error("record in '{collection}' with {key} already exists")]
    AlreadyExists { collection: String, key: String },

    /// A dotted path in a change-set runs through a non-document value
    #[error("cannot apply path '{path}' in '{collection}'")]
    InvalidPath { collection: String, path: String },

    /// A lock guarding the stored records was poisoned by a panicking writer
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Persisted data could not be read back as records
    #[error("corrupt store data: {reason}")]
    Corrupt { reason: String },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Check if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error indicates a record already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// Check if this error is related to I/O operations
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            StoreError::FileIo { .. }
                | StoreError::SerializationFailed { .. }
                | StoreError::DeserializationFailed { .. }
        )
    }

    /// Check if this error indicates stored data is unusable
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. } | StoreError::LockPoisoned)
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
