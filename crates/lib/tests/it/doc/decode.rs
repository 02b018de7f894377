//! Raw decode tests
//!
//! Covers round trips through both bundled readers, schema drift, numeric
//! width coercion, enum parsing and per-field error collection.

use docfields::{
    Error, document,
    doc::{Doc, Field, FieldError, FlushMode, Registrar, Scalar, Schema},
    raw::{JsonReader, ValueReader},
    value::{Document, ObjectId, Value},
};
use serde_json::json;

use crate::helpers::*;

fn populated_player() -> Document {
    let (_clock, player) = clean_player();
    player.hp.set(42).unwrap();
    player.name.set("ayla".to_string()).unwrap();
    player.class.set(Class::Rogue).unwrap();
    player.stats.get().level.set(7).unwrap();
    player.tags.push("veteran".to_string()).unwrap();
    let sword = player.inv.insert_new("sword".to_string()).unwrap();
    sword.qty.set(2).unwrap();
    sword.note.set("sharp".to_string()).unwrap();
    player.energy.set(4).unwrap();
    player.to_document().unwrap()
}

#[test]
fn test_value_round_trip() {
    let snapshot = populated_player();

    let (_clock, copy) = clean_player();
    let report = copy
        .deserialize(&mut ValueReader::new(&snapshot))
        .expect("Decode failed");
    assert!(report.is_clean());
    assert!(report.skipped.is_empty());

    assert_eq!(copy.hp.get(), 42);
    assert_eq!(copy.class.get(), Class::Rogue);
    assert_eq!(copy.stats.get().level.get(), 7);
    assert_eq!(copy.tags.to_vec(), vec!["veteran"]);
    assert_eq!(copy.inv.get(&"sword".to_string()).unwrap().note.get(), "sharp");
    assert_eq!(copy.energy.get(), 4);
    assert_eq!(copy.to_document().unwrap(), snapshot);
}

#[test]
fn test_json_round_trip() {
    let snapshot = populated_player();
    let json = docfields::value::json::document_to_json(&snapshot);

    let (_clock, copy) = clean_player();
    let mut reader = JsonReader::new(&json).unwrap();
    let report = copy.deserialize(&mut reader).unwrap();
    assert!(report.is_clean());
    assert_eq!(copy.to_document().unwrap(), snapshot);
}

#[test]
fn test_unknown_fields_are_skipped() {
    let (_clock, player) = clean_player();
    let input = document! {
        "hp" => 5,
        "legacy" => "gone",
        "stats" => document! { "level" => 2, "luck" => 9 },
    };
    let report = player.deserialize(&mut ValueReader::new(&input)).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.skipped, vec!["legacy", "stats.luck"]);
    assert_eq!(player.hp.get(), 5);
    assert_eq!(player.stats.get().level.get(), 2);
}

#[test]
fn test_conversion_error_keeps_previous_value() {
    let (_clock, player) = clean_player();
    player.hp.set(30).unwrap();
    player.serialize(FlushMode::Incremental).unwrap();

    let input = document! { "hp" => "lots", "name" => "bram" };
    let report = player.deserialize(&mut ValueReader::new(&input)).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].is_conversion_error());
    assert_eq!(report.errors[0].field(), "hp");
    assert_eq!(player.hp.get(), 30);
    assert_eq!(player.name.get(), "bram");
}

struct Widths {
    small: Scalar<i16>,
    unsigned: Scalar<u16>,
    normal: Scalar<i32>,
    wide: Scalar<i64>,
    huge: Scalar<u64>,
    ratio: Scalar<f64>,
}

impl Schema for Widths {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            small: fields.scalar("small")?,
            unsigned: fields.scalar("unsigned")?,
            normal: fields.scalar("normal")?,
            wide: fields.scalar("wide")?,
            huge: fields.scalar("huge")?,
            ratio: fields.scalar("ratio")?,
        })
    }
}

#[test]
fn test_integer_widths_are_coerced() {
    let doc = Doc::<Widths>::new().unwrap();
    let input = document! {
        "small" => Value::Int64(-12),
        "unsigned" => Value::Int32(65_535),
        "normal" => Value::Int64(1 << 20),
        "wide" => Value::Int32(-7),
        "huge" => Value::Int64(i64::MAX),
        "ratio" => Value::Int32(3),
    };
    let report = doc.deserialize(&mut ValueReader::new(&input)).unwrap();
    assert!(report.is_clean(), "{:?}", report.errors);

    assert_eq!(doc.small.get(), -12);
    assert_eq!(doc.unsigned.get(), 65_535);
    assert_eq!(doc.normal.get(), 1 << 20);
    assert_eq!(doc.wide.get(), -7);
    assert_eq!(doc.huge.get(), i64::MAX as u64);
    assert_eq!(doc.ratio.get(), 3.0);
}

#[test]
fn test_integer_out_of_range_is_reported() {
    let doc = Doc::<Widths>::new().unwrap();
    let input = document! {
        "small" => Value::Int32(40_000),
        "unsigned" => Value::Int32(-1),
        "normal" => Value::Int64(5_000_000_000),
        "huge" => Value::Int64(-1),
        "wide" => Value::Int64(9),
    };
    let report = doc.deserialize(&mut ValueReader::new(&input)).unwrap();
    let failed: Vec<&str> = report.errors.iter().map(FieldError::field).collect();
    assert_eq!(failed, vec!["small", "unsigned", "normal", "huge"]);
    assert_eq!(doc.wide.get(), 9);
}

#[test]
fn test_enum_parses_name_or_ordinal() {
    let (_clock, player) = clean_player();
    player
        .deserialize(&mut ValueReader::new(&document! { "class" => "MAGE" }))
        .unwrap();
    assert_eq!(player.class.get(), Class::Mage);

    player
        .deserialize(&mut ValueReader::new(&document! { "class" => 2 }))
        .unwrap();
    assert_eq!(player.class.get(), Class::Rogue);

    let report = player
        .deserialize(&mut ValueReader::new(&document! { "class" => 9 }))
        .unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(player.class.get(), Class::Rogue);
}

#[test]
fn test_null_resets_to_default() {
    let (_clock, player) = clean_player();
    player.hp.set(5).unwrap();
    player.tags.push("x".to_string()).unwrap();
    let input = document! { "hp" => Value::Null, "tags" => Value::Null };
    player.deserialize(&mut ValueReader::new(&input)).unwrap();
    assert_eq!(player.hp.get(), 0);
    assert!(player.tags.is_empty());
}

#[test]
fn test_array_element_error_keeps_previous_array() {
    let (_clock, player) = clean_player();
    player.tags.push("kept".to_string()).unwrap();
    let input = document! { "tags" => Value::Array(vec!["a".into(), Value::Int32(1)]) };
    let report = player.deserialize(&mut ValueReader::new(&input)).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].field(), "tags.1");
    assert_eq!(player.tags.to_vec(), vec!["kept"]);
}

#[test]
fn test_map_decode_replaces_entries() {
    let (_clock, player) = clean_player();
    let stale = player.inv.insert_new("stale".to_string()).unwrap();

    let input = document! {
        "inv" => document! {
            "sword" => document! { "qty" => 1 },
            "bad" => 5,
            "bow" => document! { "qty" => 2, "note" => "long" },
        },
    };
    let report = player.deserialize(&mut ValueReader::new(&input)).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].field(), "inv.bad");

    assert!(stale.is_closed());
    assert_eq!(player.inv.keys(), vec!["sword", "bow"]);
    let bow = player.inv.get(&"bow".to_string()).unwrap();
    assert_eq!(bow.note.get(), "long");
    assert_eq!(bow.qty.full_path(), "inv.bow.qty");
    assert!(!player.is_dirty());
}

#[test]
fn test_extended_json_leaves() {
    struct Ids {
        id: Scalar<ObjectId>,
        id_text: Scalar<ObjectId>,
        blob: Scalar<Vec<u8>>,
        born: Scalar<chrono::DateTime<chrono::Utc>>,
    }

    impl Schema for Ids {
        fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
            Ok(Self {
                id: fields.scalar("id")?,
                id_text: fields.scalar("id_text")?,
                blob: fields.scalar("blob")?,
                born: fields.scalar("born")?,
            })
        }
    }

    let id = ObjectId::from_bytes([7; 12]);
    let json = json!({
        "id": {"$oid": id.to_hex()},
        "id_text": id.to_hex(),
        "blob": {"$binary": "AQID"},
        "born": {"$date": 1_700_000_000_000i64},
    });
    let doc = Doc::<Ids>::new().unwrap();
    let report = doc.deserialize(&mut JsonReader::new(&json).unwrap()).unwrap();
    assert!(report.is_clean(), "{:?}", report.errors);

    assert_eq!(doc.id.get(), id);
    assert_eq!(doc.id_text.get(), id);
    assert_eq!(doc.blob.get(), vec![1, 2, 3]);
    assert_eq!(doc.born.get().timestamp_millis(), 1_700_000_000_000);
}

#[test]
fn test_malformed_stream_aborts() {
    let (_clock, player) = clean_player();
    let json = json!({ "stats": { "level": { "$date": "yesterday" } } });
    let err = player
        .deserialize(&mut JsonReader::new(&json).unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Raw(_)));
}

#[test]
fn test_reader_requires_a_document() {
    assert!(JsonReader::new(&json!([1, 2, 3])).is_err());
}
