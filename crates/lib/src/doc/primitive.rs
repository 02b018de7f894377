//! The closed set of types a scalar or array field may hold.
//!
//! Every [`Primitive`] knows its default [`FieldKind`] and how to convert to
//! and from a [`Value`]. Integers read from storage go through an explicit
//! converter table: the payload is offered to each candidate width in a
//! fixed order and the first width that both reads the payload and fits the
//! target type wins.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::trace;

use super::field::FieldKind;
use crate::value::{ObjectId, Value};

/// Conversion failure between a primitive and a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConvertError(pub String);

impl ConvertError {
    fn unexpected(expected: &str, found: &Value) -> Self {
        Self(format!("expected {expected}, found {}", found.type_name()))
    }
}

/// Types that can be stored in a scalar or array field.
pub trait Primitive: Clone + Default + 'static {
    /// Kind used when a field is registered without an explicit kind.
    const KIND: FieldKind;

    /// Converts to the persisted representation.
    fn to_value(&self) -> Result<Value, ConvertError>;

    /// Reads the persisted representation.
    fn from_value(value: &Value) -> Result<Self, ConvertError>;
}

type Candidate = fn(&Value) -> Option<i128>;

fn read_i64(value: &Value) -> Option<i64> {
    value.as_i64()
}

/// Candidate widths, tried in this order.
const INTEGER_CANDIDATES: [(&str, Candidate); 6] = [
    ("int32", |v| read_i64(v).and_then(|n| i32::try_from(n).ok()).map(i128::from)),
    ("uint32", |v| read_i64(v).and_then(|n| u32::try_from(n).ok()).map(i128::from)),
    ("int64", |v| read_i64(v).map(i128::from)),
    ("uint64", |v| read_i64(v).and_then(|n| u64::try_from(n).ok()).map(i128::from)),
    ("int16", |v| read_i64(v).and_then(|n| i16::try_from(n).ok()).map(i128::from)),
    ("uint16", |v| read_i64(v).and_then(|n| u16::try_from(n).ok()).map(i128::from)),
];

/// Reads an integer of type `T` through the candidate table.
pub(crate) fn coerce_integer<T: TryFrom<i128>>(value: &Value, target: &str) -> Result<T, ConvertError> {
    for (width, candidate) in INTEGER_CANDIDATES {
        if let Some(converted) = candidate(value).and_then(|n| T::try_from(n).ok()) {
            trace!(width, target, "integer payload accepted");
            return Ok(converted);
        }
    }
    Err(match value.as_i64() {
        Some(n) => ConvertError(format!("{n} does not fit {target}")),
        None => ConvertError::unexpected(target, value),
    })
}

macro_rules! narrow_integer {
    ($($ty:ty),+) => {$(
        impl Primitive for $ty {
            const KIND: FieldKind = FieldKind::Int32;

            fn to_value(&self) -> Result<Value, ConvertError> {
                Ok(Value::Int32(i32::from(*self)))
            }

            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                coerce_integer(value, stringify!($ty))
            }
        }
    )+};
}

narrow_integer!(i16, u16, i32);

macro_rules! wide_integer {
    ($($ty:ty),+) => {$(
        impl Primitive for $ty {
            const KIND: FieldKind = FieldKind::Int64;

            fn to_value(&self) -> Result<Value, ConvertError> {
                i64::try_from(*self)
                    .map(Value::Int64)
                    .map_err(|_| ConvertError(format!("{} exceeds the int64 range", self)))
            }

            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                coerce_integer(value, stringify!($ty))
            }
        }
    )+};
}

wide_integer!(u32, i64, u64);

impl Primitive for f64 {
    const KIND: FieldKind = FieldKind::Double;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::Double(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Double(n) => Ok(*n),
            Value::Int32(n) => Ok(f64::from(*n)),
            Value::Int64(n) => Ok(*n as f64),
            other => Err(ConvertError::unexpected("double", other)),
        }
    }
}

impl Primitive for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_bool()
            .ok_or_else(|| ConvertError::unexpected("bool", value))
    }
}

impl Primitive for String {
    const KIND: FieldKind = FieldKind::String;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConvertError::unexpected("string", value))
    }
}

impl Primitive for ObjectId {
    const KIND: FieldKind = FieldKind::ObjectId;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::ObjectId(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(s) => s.parse().map_err(|e: crate::value::ObjectIdParseError| ConvertError(e.to_string())),
            other => Err(ConvertError::unexpected("objectId", other)),
        }
    }
}

impl Primitive for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::DateTime(self.timestamp_millis()))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        let millis = match value {
            Value::DateTime(ms) | Value::Int64(ms) => *ms,
            Value::Int32(ms) => i64::from(*ms),
            other => return Err(ConvertError::unexpected("date", other)),
        };
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| ConvertError(format!("{millis} is outside the date range")))
    }
}

impl Primitive for Vec<u8> {
    const KIND: FieldKind = FieldKind::Binary;

    fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(Value::Binary(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Binary(bytes) => Ok(bytes.clone()),
            other => Err(ConvertError::unexpected("binary", other)),
        }
    }
}

/// Converts a primitive's value to the representation of a declared kind.
///
/// Integers are widened or narrowed to the declared width; a value that
/// does not fit is a [`ConvertError`].
pub(crate) fn store_as(kind: FieldKind, value: Value) -> Result<Value, ConvertError> {
    let converted = match (kind, value) {
        (FieldKind::Int32, Value::Int64(n)) => Value::Int32(
            i32::try_from(n).map_err(|_| ConvertError(format!("{n} does not fit int32")))?,
        ),
        (FieldKind::Int64, Value::Int32(n)) => Value::Int64(i64::from(n)),
        (FieldKind::Double, Value::Int32(n)) => Value::Double(f64::from(n)),
        (FieldKind::Double, Value::Int64(n)) => Value::Double(n as f64),
        (FieldKind::DateTime, Value::Int64(ms)) => Value::DateTime(ms),
        (FieldKind::DateTime, Value::Int32(ms)) => Value::DateTime(i64::from(ms)),
        (FieldKind::String, Value::ObjectId(id)) => Value::String(id.to_hex()),
        (kind, value) if kind.accepts(&value) => value,
        (kind, value) => {
            return Err(ConvertError(format!(
                "{} cannot be stored as {kind}",
                value.type_name()
            )));
        }
    };
    Ok(converted)
}

/// Reads a primitive, also accepting date payloads for integer fields.
pub(crate) fn load_as<T: Primitive>(value: &Value) -> Result<T, ConvertError> {
    match T::from_value(value) {
        Ok(v) => Ok(v),
        Err(err) => match value {
            Value::DateTime(ms) => T::from_value(&Value::Int64(*ms)).map_err(|_| err),
            _ => Err(err),
        },
    }
}

/// Reads an enum variant from its name or its ordinal.
pub fn enum_from_value<E: Copy>(
    value: &Value,
    variants: &[E],
    name: fn(&E) -> &'static str,
) -> Result<E, ConvertError> {
    match value {
        Value::String(s) => variants
            .iter()
            .find(|v| name(v).eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ConvertError(format!("unknown variant '{s}'"))),
        other => {
            let ordinal: usize = coerce_integer(other, "enum ordinal")?;
            variants
                .get(ordinal)
                .copied()
                .ok_or_else(|| ConvertError(format!("ordinal {ordinal} out of range")))
        }
    }
}

/// Declares a fieldless enum usable as a [`Primitive`].
///
/// The enum is persisted as its ordinal and decodes from either the ordinal
/// or the variant name. The first variant is the default.
///
/// ```
/// use docfields::{primitive_enum, doc::Primitive, value::Value};
///
/// primitive_enum! {
///     pub enum Class { Warrior, Mage, Rogue }
/// }
///
/// assert_eq!(Class::Mage.to_value().unwrap(), Value::Int32(1));
/// assert_eq!(Class::from_value(&Value::from("rogue")).unwrap(), Class::Rogue);
/// assert_eq!(Class::default(), Class::Warrior);
/// ```
#[macro_export]
macro_rules! primitive_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $first:ident $(, $variant:ident)* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis enum $name {
            #[default]
            $first,
            $($variant,)*
        }

        impl $name {
            pub const VARIANTS: &'static [$name] = &[$name::$first $(, $name::$variant)*];

            pub fn name(&self) -> &'static str {
                match self {
                    $name::$first => stringify!($first),
                    $($name::$variant => stringify!($variant),)*
                }
            }
        }

        impl $crate::doc::Primitive for $name {
            const KIND: $crate::doc::FieldKind = $crate::doc::FieldKind::Int32;

            fn to_value(&self) -> ::std::result::Result<$crate::value::Value, $crate::doc::ConvertError> {
                Ok($crate::value::Value::Int32(*self as i32))
            }

            fn from_value(value: &$crate::value::Value) -> ::std::result::Result<Self, $crate::doc::ConvertError> {
                $crate::doc::enum_from_value(value, Self::VARIANTS, $name::name)
            }
        }
    };
}

/// Types usable as map keys. A key is rendered as one path segment.
pub trait MapKey: Clone + PartialEq + fmt::Debug + 'static {
    fn to_segment(&self) -> String;

    fn from_segment(segment: &str) -> Option<Self>;
}

impl MapKey for String {
    fn to_segment(&self) -> String {
        self.clone()
    }

    fn from_segment(segment: &str) -> Option<Self> {
        Some(segment.to_string())
    }
}

impl MapKey for ObjectId {
    fn to_segment(&self) -> String {
        self.to_hex()
    }

    fn from_segment(segment: &str) -> Option<Self> {
        segment.parse().ok()
    }
}

/// Integer map keys, which support [`Map::next_int_key`](super::Map::next_int_key).
pub trait IntegerKey: MapKey + Ord + Copy {
    fn to_i128(self) -> i128;

    fn from_i128(n: i128) -> Option<Self>;
}

macro_rules! integer_key {
    ($($ty:ty),+) => {$(
        impl MapKey for $ty {
            fn to_segment(&self) -> String {
                self.to_string()
            }

            fn from_segment(segment: &str) -> Option<Self> {
                segment.parse().ok()
            }
        }

        impl IntegerKey for $ty {
            fn to_i128(self) -> i128 {
                i128::from(self)
            }

            fn from_i128(n: i128) -> Option<Self> {
                <$ty>::try_from(n).ok()
            }
        }
    )+};
}

integer_key!(i16, u16, i32, u32, i64, u64);
