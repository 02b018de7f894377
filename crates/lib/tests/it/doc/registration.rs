//! Schema registration tests

use docfields::{
    Error,
    doc::{Doc, Field, FieldError, FieldKind, FlushMode, Registrar, Scalar, Schema},
    value::Value,
};

use crate::helpers::*;

struct Duplicate {
    _first: Scalar<i32>,
    _second: Scalar<String>,
}

impl Schema for Duplicate {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            _first: fields.scalar("hp")?,
            _second: fields.scalar("hp")?,
        })
    }
}

#[test]
fn test_duplicate_name_is_rejected() {
    let err = Doc::<Duplicate>::new().unwrap_err();
    assert!(err.is_conflict());
    match err {
        Error::Field(FieldError::DuplicateField { name }) => assert_eq!(name, "hp"),
        other => panic!("Unexpected error: {other:?}"),
    }
}

struct StructuralScalar {
    _field: Scalar<i32>,
}

impl Schema for StructuralScalar {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            _field: fields.scalar_as(FieldKind::Object, "stats")?,
        })
    }
}

#[test]
fn test_structural_kind_through_scalar_entry_point() {
    let err = Doc::<StructuralScalar>::new().unwrap_err();
    assert!(matches!(
        err,
        Error::Field(FieldError::InvalidKind {
            kind: FieldKind::Object,
            ..
        })
    ));

    for kind in [FieldKind::Array, FieldKind::Map, FieldKind::TimeRestoring] {
        assert!(kind.is_structural(), "{kind}");
    }
}

struct Mismatched {
    _name: Scalar<String>,
}

impl Schema for Mismatched {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            _name: fields.scalar_as(FieldKind::Int32, "name")?,
        })
    }
}

#[test]
fn test_kind_the_type_cannot_be_stored_as() {
    let err = Doc::<Mismatched>::new().unwrap_err();
    assert!(matches!(err, Error::Field(FieldError::InvalidKind { .. })));
}

struct Widened {
    level: Scalar<i32>,
    ratio: Scalar<i32>,
}

impl Schema for Widened {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            level: fields.scalar_as(FieldKind::Int64, "level")?,
            ratio: fields.scalar_as(FieldKind::Double, "ratio")?,
        })
    }
}

#[test]
fn test_explicit_kind_controls_stored_width() {
    let doc = Doc::<Widened>::new().unwrap();
    assert_eq!(doc.level.kind(), FieldKind::Int64);
    doc.level.set(3).unwrap();
    doc.ratio.set(2).unwrap();

    let full = doc.serialize(FlushMode::Full).unwrap();
    assert_eq!(full.get("level"), Some(&Value::Int64(3)));
    assert_eq!(full.get("ratio"), Some(&Value::Double(2.0)));
}

#[test]
fn test_fields_report_name_and_kind() {
    let (_clock, player) = clean_player();
    assert_eq!(player.hp.name(), "hp");
    assert_eq!(player.hp.kind(), FieldKind::Int32);
    assert_eq!(player.class.kind(), FieldKind::Int32);
    assert_eq!(player.tags.kind(), FieldKind::Array);
    assert_eq!(player.stats.kind(), FieldKind::Object);
    assert_eq!(player.inv.kind(), FieldKind::Map);
    assert_eq!(player.energy.kind(), FieldKind::TimeRestoring);
    assert_eq!(player.stats.get().strength.name(), "str");
}
