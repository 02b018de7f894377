//! Value types exchanged between tracked documents and storage.
//!
//! [`Value`] is the primitive-convertible tree a document flushes into and
//! decodes from. It mirrors the element types of a typical document store:
//! leaf primitives, ordered sub-documents and arrays.
//!
//! ```
//! use docfields::{document, value::Value};
//!
//! let record = document! { "hp" => 50, "stats" => document! { "level" => 3 } };
//! assert_eq!(record.get_path("stats.level"), Some(&Value::Int32(3)));
//! ```

use std::{fmt, str::FromStr};

use rand::RngCore;
use thiserror::Error;

pub mod json;

/// Values that can be stored in a persisted record.
///
/// # Value Types
///
/// ## Leaf Values
/// - [`Value::Null`], [`Value::Bool`], [`Value::Int32`], [`Value::Int64`],
///   [`Value::Double`], [`Value::String`], [`Value::ObjectId`],
///   [`Value::DateTime`] (UTC milliseconds) and [`Value::Binary`]
///
/// ## Branch Values
/// - [`Value::Document`] - ordered sub-document
/// - [`Value::Array`] - ordered sequence
///
/// Integer comparisons against Rust integers are width-agnostic:
///
/// ```
/// # use docfields::value::Value;
/// assert!(Value::Int32(7) == 7i64);
/// assert!(Value::Int64(7) == 7);
/// assert!(Value::String("sword".into()) == "sword");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Leaf values
    /// Null/empty value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int32(i32),
    /// 64-bit integer
    Int64(i64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// 12-byte object identifier
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch, UTC
    DateTime(i64),
    /// Opaque bytes
    Binary(Vec<u8>),

    // Branch values
    /// Ordered sub-document
    Document(Document),
    /// Ordered sequence of values
    Array(Vec<Value>),
}

impl Value {
    /// Returns true if this is a leaf value
    pub fn is_leaf(&self) -> bool {
        !self.is_branch()
    }

    /// Returns true if this value contains other values
    pub fn is_branch(&self) -> bool {
        matches!(self, Value::Document(_) | Value::Array(_))
    }

    /// Returns true if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::ObjectId(_) => "objectId",
            Value::DateTime(_) => "date",
            Value::Binary(_) => "binary",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
        }
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value of either integer width
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to convert to a sub-document
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Attempts to convert to a mutable sub-document
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Attempts to convert to an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", json::to_json(self))
    }
}

/// An ordered document: field names in insertion order, each with a [`Value`].
///
/// Unlike a hash map, iteration order is stable and matches the order in
/// which fields were inserted, which is also the order tracked documents
/// declare their fields in. Equality ignores order: two documents are equal
/// when they hold the same keys with equal values.
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl Document {
    /// Creates a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value stored under `key`
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a value, replacing in place if the key already exists.
    ///
    /// Returns the previous value for the key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes a key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Iterates over the fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over the field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub(crate) fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Resolves a dotted path through nested documents.
    ///
    /// Array elements are addressed by their decimal index.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Document(doc) => doc.get(segment)?,
                Value::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at a dotted path, creating intermediate documents.
    ///
    /// Fails if an intermediate segment holds a non-document value.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), PathConflict> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(PathConflict {
                path: path.to_string(),
            });
        };

        let mut current = self;
        for segment in parents {
            if !current.contains_key(segment) {
                current.insert(*segment, Document::new());
            }
            current = current
                .get_mut(segment)
                .and_then(Value::as_document_mut)
                .ok_or_else(|| PathConflict {
                    path: path.to_string(),
                })?;
        }
        current.insert(*last, value);
        Ok(())
    }

    /// Removes the value at a dotted path, returning it if present.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let (last, parents) = segments.split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get_mut(segment)?.as_document_mut()?;
        }
        current.remove(last)
    }
}

/// A dotted path ran into a non-document value, or was empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path '{path}' does not address a document field")]
pub struct PathConflict {
    pub path: String,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", json::document_to_json(self))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```
/// # use docfields::document;
/// let d = document! { "qty" => 2, "name" => "sword" };
/// assert_eq!(d.len(), 2);
/// ```
#[macro_export]
macro_rules! document {
    () => {
        $crate::value::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::value::Document::new();
        $(
            document.insert($key, $crate::value::Value::from($value));
        )+
        document
    }};
}

/// A 12-byte object identifier: 4 bytes of big-endian seconds followed by
/// 8 random bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(bytes)
    }

    /// Wraps raw bytes
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds since the Unix epoch encoded in the identifier
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lowercase 24-character hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Error for malformed object id text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id '{input}': expected 24 hex characters")]
pub struct ObjectIdParseError {
    pub input: String,
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ObjectIdParseError {
            input: s.to_string(),
        };
        let bytes = hex::decode(s).map_err(|_| invalid())?;
        let bytes: [u8; 12] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

// Convenient From implementations for common types
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

// Width-agnostic comparisons with primitives
impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        self.as_i64() == Some(i64::from(*other))
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<Value> for i64 {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for &str {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}
