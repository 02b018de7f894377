//! Record load/insert/save tests

use std::sync::Arc;

use docfields::{
    FixedClock,
    record::{Record, RecordOptions},
    store::{InMemoryStore, MatchKey, Storage},
    value::Value,
};

use crate::helpers::*;

fn player_record(clock: &Arc<FixedClock>, id: &str) -> Record<Player> {
    Record::new(RecordOptions::new("players"), id, clock.clone()).expect("Failed to create record")
}

#[test]
fn test_first_save_inserts_whole_record() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let mut record = player_record(&clock, "p1");
    assert!(!record.is_persisted());

    record.doc().hp.set(20).unwrap();
    assert!(record.save(&store).unwrap());
    assert!(record.is_persisted());
    assert!(!record.doc().is_dirty());

    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert_eq!(stored.get("_id"), Some(&Value::from("p1")));
    assert_eq!(stored.get("hp"), Some(&Value::Int32(20)));
    assert!(stored.get("energy").is_some());
}

#[test]
fn test_save_writes_only_changes() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let mut record = player_record(&clock, "p1");
    record.insert(&store).unwrap();

    assert!(!record.save(&store).unwrap(), "clean record wrote something");

    record.doc().stats.get().level.set(9).unwrap();
    record.doc().tags.push("new".to_string()).unwrap();
    assert!(record.save(&store).unwrap());

    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert_eq!(stored.get_path("stats.level"), Some(&Value::Int32(9)));
    assert_eq!(stored.get_path("stats.str"), Some(&Value::Int32(0)));
    assert_eq!(stored.get("tags"), Some(&Value::Array(vec!["new".into()])));
}

#[test]
fn test_load_into_fresh_record() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    {
        let mut record = player_record(&clock, "p1");
        record.doc().name.set("ayla".to_string()).unwrap();
        record
            .doc()
            .inv
            .insert_new("sword".to_string())
            .unwrap()
            .qty
            .set(1)
            .unwrap();
        record.doc().energy.set(2).unwrap();
        record.insert(&store).unwrap();
        record.close();
    }

    clock.advance(4_200);
    let mut record = player_record(&clock, "p1");
    let report = record.load(&store).unwrap().expect("record missing");
    assert!(report.is_clean());
    // The key field is not part of the schema but is not reported either.
    assert!(report.skipped.is_empty());
    assert!(record.is_persisted());

    let doc = record.doc();
    assert_eq!(doc.name.get(), "ayla");
    assert_eq!(doc.inv.get(&"sword".to_string()).unwrap().qty.get(), 1);
    assert_eq!(doc.energy.get(), 6);
    assert_eq!(doc.energy.remaining_millis(), 800);

    // Loading is not a change.
    assert!(!record.save(&store).unwrap());
}

#[test]
fn test_load_missing_record() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let mut record = player_record(&clock, "ghost");
    assert!(record.load(&store).unwrap().is_none());
    assert!(!record.is_persisted());
}

#[test]
fn test_update_field_writes_one_path() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let mut record = player_record(&clock, "p1");
    record.insert(&store).unwrap();

    let stats = record.doc().stats.get();
    stats.level.set(3).unwrap();
    stats.strength.set(4).unwrap();
    record.doc().hp.set(1).unwrap();
    record.update_field(&store, &stats.level).unwrap();

    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert_eq!(stored.get_path("stats.level"), Some(&Value::Int32(3)));
    assert_eq!(stored.get_path("stats.str"), Some(&Value::Int32(0)));
    assert_eq!(stored.get("hp"), Some(&Value::Int32(0)));

    // The rest is still pending.
    assert!(record.doc().is_dirty());
    record.save(&store).unwrap();
    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert_eq!(stored.get_path("stats.str"), Some(&Value::Int32(4)));
    assert_eq!(stored.get("hp"), Some(&Value::Int32(1)));
}

#[test]
fn test_custom_key_field() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let options = RecordOptions::new("players").with_key_field("account");
    let mut record: Record<Player> = Record::new(options, 42, clock).unwrap();
    record.insert(&store).unwrap();

    let key = MatchKey::new("account", 42);
    assert_eq!(record.key(), &key);
    assert!(store.load("players", &key).unwrap().is_some());
    assert!(store.load("players", &MatchKey::new("_id", 42)).unwrap().is_none());
}

#[test]
fn test_delete_then_save_reinserts() {
    let clock = Arc::new(FixedClock::default());
    let store = InMemoryStore::new();
    let mut record = player_record(&clock, "p1");
    record.insert(&store).unwrap();

    assert!(record.delete(&store).unwrap());
    assert!(!record.is_persisted());
    assert_eq!(store.count("players").unwrap(), 0);

    record.doc().hp.set(2).unwrap();
    record.save(&store).unwrap();
    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert!(stored.get("stats").is_some());
}
