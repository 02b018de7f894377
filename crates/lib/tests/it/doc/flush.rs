//! Snapshot and incremental flush tests
//!
//! Covers full snapshots, incremental change-sets per field kind, the
//! unset list, and the all-or-nothing behavior when a value cannot be stored.

use docfields::{
    document,
    doc::{Doc, Field, FieldError, FlushMode, Registrar, Scalar, Schema},
    value::Value,
};

use crate::helpers::*;

#[test]
fn test_scalar_and_nested_object_flush() {
    let (_clock, context) = fixed_context();
    let player = Doc::<Player>::with_context(&context).expect("Failed to create player");

    player.hp.set(50).unwrap();
    player.stats.get().level.set(3).unwrap();

    let full = player.serialize(FlushMode::Full).expect("Full flush failed");
    let snapshot = full.to_document().unwrap();
    assert_eq!(snapshot.get("hp"), Some(&Value::Int32(50)));
    assert_eq!(
        snapshot.get("stats"),
        Some(&Value::Document(document! { "level" => 3, "str" => 0 }))
    );

    player.stats.get().level.set(4).unwrap();
    let changes = player
        .serialize(FlushMode::Incremental)
        .expect("Incremental flush failed");
    assert_eq!(changes.set, vec![("stats.level".to_string(), Value::Int32(4))]);
    assert!(changes.unset.is_empty());
}

#[test]
fn test_full_snapshot_covers_every_field_in_order() {
    let (clock, player) = clean_player();
    let full = player.serialize(FlushMode::Full).unwrap();

    assert_eq!(
        set_paths(&full),
        vec!["hp", "name", "class", "stats", "tags", "inv", "energy"]
    );
    assert_eq!(full.get("tags"), Some(&Value::Array(vec![])));
    assert_eq!(full.get("inv"), Some(&Value::Document(document! {})));
    assert_eq!(
        full.get("energy"),
        Some(&Value::Document(document! {
            "val" => 10i64,
            "maxval" => 10i64,
            "utime" => Value::DateTime(clock.get()),
            "tick" => 1000i64,
        }))
    );
}

#[test]
fn test_full_flush_ignores_dirty_state() {
    let (_clock, player) = clean_player();
    assert!(!player.is_dirty());
    let full = player.serialize(FlushMode::Full).unwrap();
    assert_eq!(full.set.len(), 7);
}

#[test]
fn test_incremental_emits_only_changed_fields() {
    let (_clock, player) = clean_player();

    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert!(changes.is_empty());

    player.hp.set(12).unwrap();
    player.name.set("ayla".to_string()).unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(set_paths(&changes), vec!["hp", "name"]);
    assert_eq!(changes.get("name"), Some(&Value::from("ayla")));

    // The flush cleared everything.
    assert!(!player.is_dirty());
    assert!(player.serialize(FlushMode::Incremental).unwrap().is_empty());
}

#[test]
fn test_setting_same_value_still_marks_dirty() {
    let (_clock, player) = clean_player();
    player.hp.set(0).unwrap();
    assert!(player.hp.is_dirty());
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(changes.get("hp"), Some(&Value::Int32(0)));
}

#[test]
fn test_pending_changes_does_not_clear() {
    let (_clock, player) = clean_player();
    player.hp.set(3).unwrap();

    let first = player.pending_changes(FlushMode::Incremental).unwrap();
    let second = player.pending_changes(FlushMode::Incremental).unwrap();
    assert_eq!(first, second);
    assert!(player.is_dirty());

    player.mark_clean();
    assert!(!player.is_dirty());
    assert!(player.pending_changes(FlushMode::Incremental).unwrap().is_empty());
}

#[test]
fn test_array_change_rewrites_whole_array() {
    let (_clock, player) = clean_player();
    player
        .tags
        .set_all(vec!["a".to_string(), "b".to_string()])
        .unwrap();
    player.serialize(FlushMode::Incremental).unwrap();

    player.tags.push("c".to_string()).unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(
        changes.set,
        vec![(
            "tags".to_string(),
            Value::Array(vec!["a".into(), "b".into(), "c".into()])
        )]
    );

    player.tags.set(0, "z".to_string()).unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(
        changes.get("tags"),
        Some(&Value::Array(vec!["z".into(), "b".into(), "c".into()]))
    );
}

#[test]
fn test_unset_is_recorded_once_and_read_and_clear() {
    let (_clock, player) = clean_player();
    player.hp.set(9).unwrap();
    player.hp.unset().unwrap();
    player.hp.unset().unwrap();

    assert_eq!(player.hp.get(), 0);
    assert!(!player.hp.is_dirty());

    let changes = player.pending_changes(FlushMode::Incremental).unwrap();
    assert!(changes.set.is_empty());
    assert_eq!(changes.unset, vec!["hp".to_string()]);

    assert_eq!(player.take_unset_paths(), vec!["hp".to_string()]);
    assert!(player.take_unset_paths().is_empty());
}

#[test]
fn test_flush_drains_unset_list() {
    let (_clock, player) = clean_player();
    player.name.unset().unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(changes.unset, vec!["name".to_string()]);
    assert!(player.serialize(FlushMode::Incremental).unwrap().is_empty());
}

#[test]
fn test_set_after_unset_wins() {
    let (_clock, player) = clean_player();
    player.hp.unset().unwrap();
    player.hp.set(4).unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(changes.set, vec![("hp".to_string(), Value::Int32(4))]);
    assert!(changes.unset.is_empty());
}

#[test]
fn test_nested_unset_collapses_under_parent() {
    let (_clock, player) = clean_player();
    player.stats.get().level.unset().unwrap();
    player.stats.unset().unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(changes.unset, vec!["stats".to_string()]);
}

#[test]
fn test_nested_field_unset_uses_full_path() {
    let (_clock, player) = clean_player();
    let stats = player.stats.get();
    stats.strength.unset().unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(changes.unset, vec!["stats.str".to_string()]);
}

struct Counter {
    big: Scalar<u64>,
    small: Scalar<i32>,
}

impl Schema for Counter {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            big: fields.scalar("big")?,
            small: fields.scalar("small")?,
        })
    }
}

#[test]
fn test_unrepresentable_value_aborts_flush() {
    let counter = Doc::<Counter>::new().unwrap();
    counter.small.set(1).unwrap();
    counter.big.set(u64::MAX).unwrap();

    let err = counter.serialize(FlushMode::Incremental).unwrap_err();
    assert!(err.is_type_error());

    // Nothing was cleared.
    assert!(counter.small.is_dirty());
    assert!(counter.big.is_dirty());

    counter.big.set(7).unwrap();
    let changes = counter.serialize(FlushMode::Incremental).unwrap();
    assert_eq!(
        changes.set,
        vec![
            ("big".to_string(), Value::Int64(7)),
            ("small".to_string(), Value::Int32(1)),
        ]
    );
}

#[test]
fn test_field_to_value_matches_snapshot() {
    let (_clock, player) = clean_player();
    player.stats.get().level.set(8).unwrap();
    let full = player.pending_changes(FlushMode::Full).unwrap();
    assert_eq!(
        full.get("stats"),
        Some(&player.stats.to_value().unwrap())
    );
    assert_eq!(player.to_document().unwrap(), full.to_document().unwrap());
}
