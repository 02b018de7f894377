//! Close and reuse tests

use docfields::{
    doc::{Doc, FlushMode},
    raw::ValueReader,
    document,
};

use crate::helpers::*;

#[test]
fn test_closed_document_rejects_mutation() {
    let (_clock, player) = clean_player();
    player.hp.set(8).unwrap();
    let stats = player.stats.get();
    player.close();

    assert!(player.is_closed());
    assert!(stats.is_closed());
    assert!(player.hp.set(1).unwrap_err().is_use_after_close());
    assert!(stats.level.set(1).unwrap_err().is_use_after_close());
    assert!(player.tags.push("x".to_string()).unwrap_err().is_use_after_close());
    assert!(player.inv.insert_new("a".to_string()).unwrap_err().is_use_after_close());
    assert!(player.energy.set(1).unwrap_err().is_use_after_close());

    assert!(player.serialize(FlushMode::Full).unwrap_err().is_use_after_close());
    let err = player
        .deserialize(&mut ValueReader::new(&document! { "hp" => 1 }))
        .unwrap_err();
    assert!(err.is_use_after_close());

    // Reads still answer with the last value.
    assert_eq!(player.hp.get(), 8);
}

#[test]
fn test_close_is_idempotent() {
    let doc = Doc::<Outer>::new().unwrap();
    doc.close();
    doc.close();
    assert!(doc.is_closed());
}

#[test]
fn test_handles_share_one_document() {
    let (_clock, player) = clean_player();
    let other = player.clone();
    other.hp.set(77).unwrap();
    assert_eq!(player.hp.get(), 77);
    assert!(player.ptr_eq(&other));
    assert!(player.is_dirty());
}
