//!
//! docfields: typed, change-tracking documents for document stores.
//!
//! Application code declares a record's layout once, mutates strongly-typed
//! fields, and asks the document for either a full snapshot or the minimal
//! set of dotted-path `set`/`unset` operations needed to bring the stored
//! record up to date.
//!
//! ## Core Concepts
//!
//! * **Documents (`doc::Doc`)**: A typed tree of fields declared by a `doc::Schema`.
//! * **Fields (`doc::Scalar`, `doc::Array`, `doc::Object`, `doc::Map`, `doc::TimeRestoring`)**:
//!   Named, typed values carrying a dirty flag and a weak link to their owner.
//! * **Change-sets (`doc::ChangeSet`)**: The output of a flush, either every
//!   top-level field or only the changed paths plus the paths to remove.
//! * **Raw readers (`raw::RawReader`)**: Tagged key/value streams a document
//!   decodes from.
//! * **Storage (`store::Storage`)**: The boundary a change-set is written to;
//!   `store::InMemoryStore` is the bundled implementation.
//! * **Records (`record::Record`)**: A document bound to a collection and key,
//!   with load/insert/save and the tick queue for regenerating fields.

pub mod clock;
pub mod constants;
pub mod doc;
pub mod raw;
pub mod record;
pub mod store;
pub mod value;

pub use clock::{Clock, SystemClock};

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the docfields library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the docfields library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured field errors from the doc module
    #[error(transparent)]
    Field(doc::FieldError),

    /// Malformed raw streams from the raw module
    #[error(transparent)]
    Raw(raw::RawError),

    /// Structured storage errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// A change-set or dotted write ran into a non-document value
    #[error(transparent)]
    Path(#[from] value::PathConflict),

    /// JSON that cannot be read as a value tree
    #[error(transparent)]
    Json(#[from] value::json::JsonValueError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Field(_) => "doc",
            Error::Raw(_) => "raw",
            Error::Store(_) => "store",
            Error::Path(_) | Error::Json(_) => "value",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Field(doc::FieldError::MissingEntry { .. }) => true,
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_registration_error(),
            Error::Store(store_err) => store_err.is_already_exists(),
            _ => false,
        }
    }

    /// Check if this error is a decode-time conversion failure.
    pub fn is_conversion_error(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_conversion_error(),
            Error::Raw(_) | Error::Json(_) => true,
            _ => false,
        }
    }

    /// Check if this error is a value with no stored representation.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_type_mismatch(),
            Error::Path(_) => true,
            _ => false,
        }
    }

    /// Check if this error came from touching a closed document or field.
    pub fn is_use_after_close(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_use_after_close(),
            _ => false,
        }
    }

    /// Check if this error is field-related.
    pub fn is_field_error(&self) -> bool {
        matches!(self, Error::Field(_))
    }

    /// Check if this error is storage-related.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) | Error::Serialize(_) => true,
            Error::Store(store_err) => store_err.is_io_error(),
            _ => false,
        }
    }
}
