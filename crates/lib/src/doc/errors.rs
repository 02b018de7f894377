//! Error types for field registration, conversion and lifecycle.

use thiserror::Error;

use super::field::FieldKind;

/// Structured error types for document and field operations.
///
/// Registration errors (`DuplicateField`, `InvalidKind`) indicate a schema
/// bug and are returned from `Schema::describe`. `ConversionError` is
/// produced per field while decoding and collected in a `DecodeReport`.
/// `TypeMismatch` aborts a flush before anything is cleared.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A field name was registered twice on the same document
    #[error("field '{name}' is already registered")]
    DuplicateField { name: String },

    /// The requested kind cannot be registered through this entry point
    #[error("field '{name}' cannot be registered as {kind}")]
    InvalidKind { name: String, kind: FieldKind },

    /// A decoded payload does not fit the field's bound type
    #[error("cannot decode field '{field}': expected {expected}, found {found}")]
    ConversionError {
        field: String,
        expected: String,
        found: String,
    },

    /// A value has no representation in the persisted value set
    #[error("cannot serialize field '{field}': {reason}")]
    TypeMismatch { field: String, reason: String },

    /// The field or its document has been closed
    #[error("field '{field}' used after close")]
    UseAfterClose { field: String },

    /// A map key cannot be used as a path segment
    #[error("invalid key '{key}' for map '{field}': {reason}")]
    InvalidKey {
        field: String,
        key: String,
        reason: String,
    },

    /// An array index is past the end
    #[error("index {index} out of bounds for '{field}' of length {len}")]
    OutOfBounds {
        field: String,
        index: usize,
        len: usize,
    },

    /// A map key has no entry
    #[error("map '{field}' has no entry '{key}'")]
    MissingEntry { field: String, key: String },

    /// A document handed to a container already belongs to another one
    #[error("document for '{field}' is already attached elsewhere")]
    AlreadyAttached { field: String },
}

impl FieldError {
    /// Check if this error comes from schema registration
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            FieldError::DuplicateField { .. } | FieldError::InvalidKind { .. }
        )
    }

    /// Check if this error was raised while decoding
    pub fn is_conversion_error(&self) -> bool {
        matches!(self, FieldError::ConversionError { .. })
    }

    /// Check if this error was raised while serializing
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, FieldError::TypeMismatch { .. })
    }

    /// Check if this error indicates use of a closed document
    pub fn is_use_after_close(&self) -> bool {
        matches!(self, FieldError::UseAfterClose { .. })
    }

    /// Check if this error concerns a map key
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            FieldError::InvalidKey { .. } | FieldError::MissingEntry { .. }
        )
    }

    /// Get the field name or path this error refers to
    pub fn field(&self) -> &str {
        match self {
            FieldError::DuplicateField { name } | FieldError::InvalidKind { name, .. } => name,
            FieldError::ConversionError { field, .. }
            | FieldError::TypeMismatch { field, .. }
            | FieldError::UseAfterClose { field }
            | FieldError::InvalidKey { field, .. }
            | FieldError::OutOfBounds { field, .. }
            | FieldError::MissingEntry { field, .. }
            | FieldError::AlreadyAttached { field } => field,
        }
    }
}

impl From<FieldError> for crate::Error {
    fn from(err: FieldError) -> Self {
        crate::Error::Field(err)
    }
}
