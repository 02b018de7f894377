//! In-memory store tests driven by real change-sets

use docfields::{
    document,
    doc::FlushMode,
    store::{InMemoryStore, MatchKey, Storage},
    value::Value,
};

use crate::helpers::*;

const PLAYERS: &str = "players";

#[test]
fn test_incremental_change_set_applies_to_stored_record() {
    let store = InMemoryStore::new();
    let key = MatchKey::new("_id", "p1");

    let (_clock, player) = clean_player();
    let sword = player.inv.insert_new("sword".to_string()).unwrap();
    let full = player.serialize(FlushMode::Full).unwrap();
    store
        .write_full(PLAYERS, &key, &full.to_document().unwrap())
        .unwrap();

    sword.qty.set(2).unwrap();
    player.stats.get().level.set(5).unwrap();
    player.name.unset().unwrap();
    let changes = player.serialize(FlushMode::Incremental).unwrap();
    store
        .write_changes(PLAYERS, &key, &changes.set, &changes.unset)
        .unwrap();

    let stored = store.load(PLAYERS, &key).unwrap().expect("record missing");
    assert_eq!(stored.get("_id"), Some(&Value::from("p1")));
    assert_eq!(stored.get_path("inv.sword.qty"), Some(&Value::Int32(2)));
    assert_eq!(stored.get_path("stats.level"), Some(&Value::Int32(5)));
    assert_eq!(stored.get("name"), None);

    // The stored record now matches the in-memory document.
    let mut expected = player.to_document().unwrap();
    expected.remove("name");
    expected.insert("_id", "p1");
    assert_eq!(stored, expected);
}

#[test]
fn test_storage_as_trait_object() {
    let store: Box<dyn Storage> = Box::new(InMemoryStore::new());
    let key = MatchKey::new("_id", 1);
    assert!(store.load(PLAYERS, &key).unwrap().is_none());

    store
        .write_full(PLAYERS, &key, &document! { "hp" => 3 })
        .unwrap();
    store
        .write_full(PLAYERS, &key, &document! { "hp" => 4 })
        .unwrap();
    let stored = store.load(PLAYERS, &key).unwrap().unwrap();
    assert_eq!(stored, document! { "_id" => 1, "hp" => 4 });

    assert!(store.delete(PLAYERS, &key).unwrap());
    assert!(store.load(PLAYERS, &key).unwrap().is_none());
}

#[test]
fn test_collections_are_separate() {
    let store = InMemoryStore::new();
    let key = MatchKey::new("_id", 1);
    store.insert("a", &key, &document! { "x" => 1 }).unwrap();
    store.insert("b", &key, &document! { "x" => 2 }).unwrap();

    assert_eq!(store.collection_names().unwrap(), vec!["a", "b"]);
    assert_eq!(
        store.load("b", &key).unwrap().unwrap().get("x"),
        Some(&Value::Int32(2))
    );
}

#[test]
fn test_save_and_load_file_preserves_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("players.json");
    let key = MatchKey::new("_id", "p1");

    let (_clock, player) = clean_player();
    player.hp.set(9).unwrap();
    player.energy.set(3).unwrap();
    {
        let store = InMemoryStore::new();
        let full = player.serialize(FlushMode::Full).unwrap();
        store
            .write_full(PLAYERS, &key, &full.to_document().unwrap())
            .unwrap();
        store.save_to_file(&path).unwrap();
    }

    let store = InMemoryStore::load_from_file(&path).unwrap();
    let stored = store.load(PLAYERS, &key).unwrap().unwrap();
    assert_eq!(stored.get("hp"), Some(&Value::Int32(9)));
    assert_eq!(
        stored.get_path("energy.utime"),
        Some(&Value::DateTime(player.energy.last_update_millis()))
    );
}
