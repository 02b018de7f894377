//! The storage boundary change-sets are written to.
//!
//! A [`Storage`] keeps records grouped into named collections, each record a
//! [`Document`] identified by one key field. Documents hand it either a full
//! value tree or the dotted `set`/`unset` paths of an incremental flush.

use std::fmt;

use crate::{
    Result,
    value::{Document, Value},
};

mod errors;
pub use errors::StoreError;

mod in_memory;
pub use in_memory::InMemoryStore;

/// Selects one record: the value its key field must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchKey {
    pub field: String,
    pub value: Value,
}

impl MatchKey {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if `doc` carries this key.
    ///
    /// Integers compare by value regardless of width.
    pub fn matches(&self, doc: &Document) -> bool {
        match (doc.get(&self.field), &self.value) {
            (None, _) => false,
            (Some(found), Value::Int32(_) | Value::Int64(_)) => {
                found.as_i64().is_some() && found.as_i64() == self.value.as_i64()
            }
            (Some(found), wanted) => found == wanted,
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.value)
    }
}

/// A document store holding records by collection and key.
///
/// Implementations must apply each write atomically: either every path of a
/// change-set lands or none does.
pub trait Storage: Send + Sync {
    /// Fetches the record matching `key`, if any.
    fn load(&self, collection: &str, key: &MatchKey) -> Result<Option<Document>>;

    /// Replaces the record matching `key` with `doc`, inserting it if absent.
    fn write_full(&self, collection: &str, key: &MatchKey, doc: &Document) -> Result<()>;

    /// Applies dotted-path writes and removals to the record matching `key`.
    ///
    /// A missing record is created from the key and the `set` paths.
    fn write_changes(&self, collection: &str, key: &MatchKey, set: &[(String, Value)], unset: &[String]) -> Result<()>;

    /// Removes the record matching `key`. Returns false if there was none.
    fn delete(&self, collection: &str, key: &MatchKey) -> Result<bool>;
}
