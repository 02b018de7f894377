//! Conversion between [`Value`] trees and `serde_json` values.
//!
//! Leaf types JSON cannot express natively use the extended-JSON wrappers
//! common to document stores:
//!
//! | Value              | JSON                               |
//! |--------------------|------------------------------------|
//! | `ObjectId`         | `{"$oid": "<24 hex chars>"}`        |
//! | `DateTime`         | `{"$date": <millis>}`               |
//! | `Binary`           | `{"$binary": "<base64>"}`           |
//! | non-finite `Double`| `{"$numberDouble": "NaN"}` etc.     |
//! | `Int64`            | plain number, or `{"$numberLong": "..."}` on input |

use base64ct::{Base64, Encoding};
use serde_json::{Map as JsonMap, Number, Value as Json};
use thiserror::Error;

use super::{Document, ObjectId, Value};

/// Errors produced when a JSON value cannot be read as a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonValueError {
    /// An extended-JSON wrapper carried a payload of the wrong shape
    #[error("malformed {wrapper} wrapper: {reason}")]
    MalformedWrapper {
        wrapper: &'static str,
        reason: String,
    },

    /// A number fits neither integer width nor a finite double
    #[error("unrepresentable number {number}")]
    UnrepresentableNumber { number: String },
}

/// Converts a value tree to JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int32(n) => Json::from(*n),
        Value::Int64(n) => Json::from(*n),
        Value::Double(n) => match Number::from_f64(*n) {
            Some(number) => Json::Number(number),
            None => wrapper("$numberDouble", Json::String(non_finite_name(*n).to_string())),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::ObjectId(id) => wrapper("$oid", Json::String(id.to_hex())),
        Value::DateTime(millis) => wrapper("$date", Json::from(*millis)),
        Value::Binary(bytes) => wrapper("$binary", Json::String(Base64::encode_string(bytes))),
        Value::Document(doc) => document_to_json(doc),
        Value::Array(values) => Json::Array(values.iter().map(to_json).collect()),
    }
}

/// Converts an ordered document to a JSON object.
pub fn document_to_json(doc: &Document) -> Json {
    let map: JsonMap<String, Json> = doc
        .iter()
        .map(|(k, v)| (k.to_string(), to_json(v)))
        .collect();
    Json::Object(map)
}

/// Reads a JSON value back into a value tree.
pub fn from_json(json: &Json) -> Result<Value, JsonValueError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(number) => number_value(number),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(values) => values
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Json::Object(map) => match extended_leaf(map) {
            Some(leaf) => leaf,
            None => document_from_json(map).map(Value::Document),
        },
    }
}

/// Reads a JSON object into an ordered document.
pub fn document_from_json(map: &JsonMap<String, Json>) -> Result<Document, JsonValueError> {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.insert(key.clone(), from_json(value)?);
    }
    Ok(doc)
}

/// Integers that fit 32 bits become `Int32`, other integers `Int64`,
/// everything else `Double`.
pub(crate) fn number_value(number: &Number) -> Result<Value, JsonValueError> {
    if let Some(n) = number.as_i64() {
        return Ok(match i32::try_from(n) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(n),
        });
    }
    number
        .as_f64()
        .map(Value::Double)
        .ok_or_else(|| JsonValueError::UnrepresentableNumber {
            number: number.to_string(),
        })
}

/// Recognizes single-key extended-JSON wrappers.
///
/// Returns `None` when the object is an ordinary sub-document.
pub(crate) fn extended_leaf(map: &JsonMap<String, Json>) -> Option<Result<Value, JsonValueError>> {
    if map.len() != 1 {
        return None;
    }
    let (key, inner) = map.iter().next()?;
    let parsed = match key.as_str() {
        "$oid" => inner
            .as_str()
            .ok_or_else(|| malformed("$oid", "expected a string"))
            .and_then(|s| {
                s.parse::<ObjectId>()
                    .map(Value::ObjectId)
                    .map_err(|e| malformed("$oid", e.to_string()))
            }),
        "$date" => inner
            .as_i64()
            .map(Value::DateTime)
            .ok_or_else(|| malformed("$date", "expected integer milliseconds")),
        "$binary" => inner
            .as_str()
            .ok_or_else(|| malformed("$binary", "expected a base64 string"))
            .and_then(|s| {
                Base64::decode_vec(s)
                    .map(Value::Binary)
                    .map_err(|e| malformed("$binary", e.to_string()))
            }),
        "$numberLong" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::Int64)
            .ok_or_else(|| malformed("$numberLong", "expected a decimal string")),
        "$numberDouble" => match inner.as_str() {
            Some("NaN") => Ok(Value::Double(f64::NAN)),
            Some("Infinity") => Ok(Value::Double(f64::INFINITY)),
            Some("-Infinity") => Ok(Value::Double(f64::NEG_INFINITY)),
            Some(other) => other
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| malformed("$numberDouble", e.to_string())),
            None => Err(malformed("$numberDouble", "expected a string")),
        },
        _ => return None,
    };
    Some(parsed)
}

fn wrapper(key: &str, inner: Json) -> Json {
    let mut map = JsonMap::new();
    map.insert(key.to_string(), inner);
    Json::Object(map)
}

fn malformed(wrapper: &'static str, reason: impl Into<String>) -> JsonValueError {
    JsonValueError::MalformedWrapper {
        wrapper,
        reason: reason.into(),
    }
}

fn non_finite_name(n: f64) -> &'static str {
    if n.is_nan() {
        "NaN"
    } else if n > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}
