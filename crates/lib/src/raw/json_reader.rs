use std::{iter::Enumerate, slice::Iter};

use serde_json::{Map as JsonMap, Value as Json, map::Iter as MapIter};

use super::{RawElement, RawError, RawPayload, RawReader, leaf_payload};
use crate::value::json::{extended_leaf, number_value};

/// Reads a `serde_json` object as a raw stream.
///
/// Single-key `$oid`, `$date`, `$binary`, `$numberLong` and `$numberDouble`
/// objects are read as the corresponding leaf; a malformed wrapper is a
/// [`RawError::Malformed`].
pub struct JsonReader<'a> {
    source: Source<'a>,
}

enum Source<'a> {
    Entries(MapIter<'a>),
    Elements(Enumerate<Iter<'a, Json>>),
}

impl<'a> JsonReader<'a> {
    /// Reads a top-level JSON object.
    pub fn new(json: &'a Json) -> Result<Self, RawError> {
        match json {
            Json::Object(map) => Ok(Self::from_map(map)),
            other => Err(RawError::NotADocument {
                found: json_type(other).to_string(),
            }),
        }
    }

    pub fn from_map(map: &'a JsonMap<String, Json>) -> Self {
        Self {
            source: Source::Entries(map.iter()),
        }
    }

    fn array(values: &'a [Json]) -> Self {
        Self {
            source: Source::Elements(values.iter().enumerate()),
        }
    }
}

fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn payload<'a>(name: &str, json: &'a Json) -> Result<RawPayload<'a>, RawError> {
    let malformed = |reason: String| RawError::Malformed {
        name: name.to_string(),
        reason,
    };
    Ok(match json {
        Json::Null => RawPayload::Null,
        Json::Bool(b) => RawPayload::Bool(*b),
        Json::Number(number) => {
            let value = number_value(number).map_err(|e| malformed(e.to_string()))?;
            leaf_payload(value).ok_or_else(|| malformed("number read as a branch".into()))?
        }
        Json::String(s) => RawPayload::String(s.clone()),
        Json::Array(values) => RawPayload::Array(Box::new(JsonReader::array(values))),
        Json::Object(map) => match extended_leaf(map) {
            Some(Ok(value)) => {
                leaf_payload(value).ok_or_else(|| malformed("wrapper read as a branch".into()))?
            }
            Some(Err(e)) => return Err(malformed(e.to_string())),
            None => RawPayload::Document(Box::new(JsonReader::from_map(map))),
        },
    })
}

impl<'a> RawReader<'a> for JsonReader<'a> {
    fn next_element(&mut self) -> Result<Option<RawElement<'a>>, RawError> {
        let (name, json) = match &mut self.source {
            Source::Entries(iter) => match iter.next() {
                Some((name, json)) => (name.clone(), json),
                None => return Ok(None),
            },
            Source::Elements(iter) => match iter.next() {
                Some((index, json)) => (index.to_string(), json),
                None => return Ok(None),
            },
        };
        let payload = payload(&name, json)?;
        Ok(Some(RawElement { name, payload }))
    }
}
