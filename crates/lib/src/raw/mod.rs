//! Tagged key/value streams consumed by document decoding.
//!
//! A [`RawReader`] yields `(name, payload)` elements in document order. The
//! payload's variant is its type tag; nested documents and arrays are
//! themselves readers, so decoding walks the stream without materializing
//! the whole record first.
//!
//! Two readers ship with the crate:
//!
//! - [`ValueReader`] over an in-memory [`Document`](crate::value::Document)
//! - [`JsonReader`] over a `serde_json` object using extended-JSON leaves

use std::fmt;

use thiserror::Error;

use crate::value::{Document, ObjectId, Value};

mod json_reader;
mod value_reader;

pub use json_reader::JsonReader;
pub use value_reader::ValueReader;

/// Type tag of a raw element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Null,
    Bool,
    Int32,
    Int64,
    Double,
    String,
    ObjectId,
    DateTime,
    Binary,
    Document,
    Array,
}

impl ElementType {
    /// Returns the type name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Null => "null",
            ElementType::Bool => "bool",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::ObjectId => "objectId",
            ElementType::DateTime => "date",
            ElementType::Binary => "binary",
            ElementType::Document => "document",
            ElementType::Array => "array",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The payload of one element. Branch payloads are sub-streams.
pub enum RawPayload<'a> {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    ObjectId(ObjectId),
    DateTime(i64),
    Binary(Vec<u8>),
    Document(Box<dyn RawReader<'a> + 'a>),
    Array(Box<dyn RawReader<'a> + 'a>),
}

impl<'a> RawPayload<'a> {
    /// The element's type tag
    pub fn element_type(&self) -> ElementType {
        match self {
            RawPayload::Null => ElementType::Null,
            RawPayload::Bool(_) => ElementType::Bool,
            RawPayload::Int32(_) => ElementType::Int32,
            RawPayload::Int64(_) => ElementType::Int64,
            RawPayload::Double(_) => ElementType::Double,
            RawPayload::String(_) => ElementType::String,
            RawPayload::ObjectId(_) => ElementType::ObjectId,
            RawPayload::DateTime(_) => ElementType::DateTime,
            RawPayload::Binary(_) => ElementType::Binary,
            RawPayload::Document(_) => ElementType::Document,
            RawPayload::Array(_) => ElementType::Array,
        }
    }

    /// Converts a leaf payload to a [`Value`]; branch payloads are handed
    /// back unchanged.
    pub fn into_leaf(self) -> Result<Value, RawPayload<'a>> {
        Ok(match self {
            RawPayload::Null => Value::Null,
            RawPayload::Bool(b) => Value::Bool(b),
            RawPayload::Int32(n) => Value::Int32(n),
            RawPayload::Int64(n) => Value::Int64(n),
            RawPayload::Double(n) => Value::Double(n),
            RawPayload::String(s) => Value::String(s),
            RawPayload::ObjectId(id) => Value::ObjectId(id),
            RawPayload::DateTime(ms) => Value::DateTime(ms),
            RawPayload::Binary(bytes) => Value::Binary(bytes),
            branch @ (RawPayload::Document(_) | RawPayload::Array(_)) => return Err(branch),
        })
    }

    /// Reads the payload completely, materializing sub-streams.
    pub fn into_value(self) -> Result<Value, RawError> {
        match self {
            RawPayload::Document(mut reader) => read_document(reader.as_mut()).map(Value::Document),
            RawPayload::Array(mut reader) => {
                let mut values = Vec::new();
                while let Some(element) = reader.next_element()? {
                    values.push(element.payload.into_value()?);
                }
                Ok(Value::Array(values))
            }
            leaf => Ok(leaf.into_leaf().unwrap_or(Value::Null)),
        }
    }
}

impl fmt::Debug for RawPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawPayload::Document(_) => f.write_str("Document(<stream>)"),
            RawPayload::Array(_) => f.write_str("Array(<stream>)"),
            RawPayload::Null => f.write_str("Null"),
            RawPayload::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            RawPayload::Int32(n) => f.debug_tuple("Int32").field(n).finish(),
            RawPayload::Int64(n) => f.debug_tuple("Int64").field(n).finish(),
            RawPayload::Double(n) => f.debug_tuple("Double").field(n).finish(),
            RawPayload::String(s) => f.debug_tuple("String").field(s).finish(),
            RawPayload::ObjectId(id) => f.debug_tuple("ObjectId").field(id).finish(),
            RawPayload::DateTime(ms) => f.debug_tuple("DateTime").field(ms).finish(),
            RawPayload::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
        }
    }
}

/// Leaf values map onto payloads one to one; branches have no leaf payload.
pub(crate) fn leaf_payload<'a>(value: Value) -> Option<RawPayload<'a>> {
    Some(match value {
        Value::Null => RawPayload::Null,
        Value::Bool(b) => RawPayload::Bool(b),
        Value::Int32(n) => RawPayload::Int32(n),
        Value::Int64(n) => RawPayload::Int64(n),
        Value::Double(n) => RawPayload::Double(n),
        Value::String(s) => RawPayload::String(s),
        Value::ObjectId(id) => RawPayload::ObjectId(id),
        Value::DateTime(ms) => RawPayload::DateTime(ms),
        Value::Binary(bytes) => RawPayload::Binary(bytes),
        Value::Document(_) | Value::Array(_) => return None,
    })
}

/// One `(name, payload)` element. Array elements are named by index.
#[derive(Debug)]
pub struct RawElement<'a> {
    pub name: String,
    pub payload: RawPayload<'a>,
}

/// Sequential reader over a tagged key/value stream.
pub trait RawReader<'a> {
    /// Returns the next element, or `None` at the end of the (sub-)document.
    fn next_element(&mut self) -> Result<Option<RawElement<'a>>, RawError>;
}

/// Reads every remaining element of a reader into a [`Document`].
pub fn read_document<'a>(reader: &mut (dyn RawReader<'a> + 'a)) -> Result<Document, RawError> {
    let mut doc = Document::new();
    while let Some(element) = reader.next_element()? {
        doc.insert(element.name, element.payload.into_value()?);
    }
    Ok(doc)
}

/// Errors raised by the stream itself, as opposed to field conversion.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawError {
    /// The stream is structurally invalid at `name`
    #[error("malformed element '{name}': {reason}")]
    Malformed { name: String, reason: String },

    /// The top-level input is not a document
    #[error("expected a document at the top level, found {found}")]
    NotADocument { found: String },
}

impl RawError {
    /// Check if this error describes a malformed element
    pub fn is_malformed(&self) -> bool {
        matches!(self, RawError::Malformed { .. })
    }
}

impl From<RawError> for crate::Error {
    fn from(err: RawError) -> Self {
        crate::Error::Raw(err)
    }
}
