use std::{iter::Enumerate, slice::Iter};

use super::{RawElement, RawError, RawPayload, RawReader, leaf_payload};
use crate::value::{Document, Value};

/// Reads an in-memory [`Document`] as a raw stream.
///
/// Leaves are cloned as they are read; sub-documents and arrays become
/// nested readers borrowing from the source.
pub struct ValueReader<'a> {
    source: Source<'a>,
}

enum Source<'a> {
    Entries(Iter<'a, (String, Value)>),
    Elements(Enumerate<Iter<'a, Value>>),
}

impl<'a> ValueReader<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            source: Source::Entries(document.entries().iter()),
        }
    }

    /// Reads an array; elements are named by their index.
    pub fn array(values: &'a [Value]) -> Self {
        Self {
            source: Source::Elements(values.iter().enumerate()),
        }
    }
}

fn payload<'a>(value: &'a Value) -> RawPayload<'a> {
    match value {
        Value::Document(doc) => RawPayload::Document(Box::new(ValueReader::new(doc))),
        Value::Array(values) => RawPayload::Array(Box::new(ValueReader::array(values))),
        leaf => leaf_payload(leaf.clone()).unwrap_or(RawPayload::Null),
    }
}

impl<'a> RawReader<'a> for ValueReader<'a> {
    fn next_element(&mut self) -> Result<Option<RawElement<'a>>, RawError> {
        let element = match &mut self.source {
            Source::Entries(iter) => iter.next().map(|(name, value)| RawElement {
                name: name.clone(),
                payload: payload(value),
            }),
            Source::Elements(iter) => iter.next().map(|(index, value)| RawElement {
                name: index.to_string(),
                payload: payload(value),
            }),
        };
        Ok(element)
    }
}
