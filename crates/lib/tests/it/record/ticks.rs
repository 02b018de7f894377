//! Live regeneration ticks routed through the record's queue
//!
//! Tokio time is paused, so sleeping timer tasks fire as soon as the test
//! awaits. The document clock is a `FixedClock` moved in step.

use std::{sync::Arc, time::Duration};

use docfields::{
    FixedClock,
    doc::{Doc, DocContext, Field, FlushMode, TickQueue},
    record::{Record, RecordOptions},
    store::{InMemoryStore, Storage},
    value::Value,
};

use crate::helpers::*;

fn player_record(clock: &Arc<FixedClock>) -> Record<Player> {
    Record::new(RecordOptions::new("players"), "p1", clock.clone()).expect("Failed to create record")
}

#[tokio::test(start_paused = true)]
async fn test_tick_adds_one_per_interval() {
    let clock = Arc::new(FixedClock::default());
    let mut record = player_record(&clock);
    let store = InMemoryStore::new();
    record.insert(&store).unwrap();

    record.doc().energy.set(7).unwrap();
    record.save(&store).unwrap();

    clock.advance(1_000);
    assert!(record.next_tick().await);
    assert_eq!(record.doc().energy.get(), 8);
    assert!(record.doc().energy.is_dirty());
    assert_eq!(record.doc().energy.last_update_millis(), clock.get());

    // Never more than one per tick.
    clock.advance(1_000);
    assert!(record.next_tick().await);
    assert_eq!(record.doc().energy.get(), 9);

    record.save(&store).unwrap();
    let stored = store.load("players", record.key()).unwrap().unwrap();
    assert_eq!(stored.get_path("energy.val"), Some(&Value::Int64(9)));
}

#[tokio::test(start_paused = true)]
async fn test_reaching_max_stops_ticks() {
    let clock = Arc::new(FixedClock::default());
    let mut record = player_record(&clock);
    record.doc().energy.set(ENERGY_MAX - 1).unwrap();

    clock.advance(1_000);
    assert!(record.next_tick().await);
    assert_eq!(record.doc().energy.get(), ENERGY_MAX);
    assert!(!record.doc().energy.is_regenerating());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(record.apply_ticks(), 0);
    assert_eq!(record.doc().energy.get(), ENERGY_MAX);
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_timer_delivers_nothing() {
    let clock = Arc::new(FixedClock::default());
    let mut record = player_record(&clock);
    record.doc().energy.set(3).unwrap();
    record.doc().energy.set(ENERGY_MAX).unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(record.apply_ticks(), 0);
    assert_eq!(record.doc().energy.get(), ENERGY_MAX);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_applied_on_the_owner_side() {
    let clock = Arc::new(FixedClock::default());
    let mut record = player_record(&clock);
    record.doc().energy.set(1).unwrap();
    record.doc().serialize(FlushMode::Incremental).unwrap();

    // Delivered but not yet applied.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    tokio::task::yield_now().await;
    assert_eq!(record.doc().energy.get(), 1);
    assert!(!record.doc().is_dirty());

    clock.advance(1_000);
    assert_eq!(record.apply_ticks(), 1);
    assert_eq!(record.doc().energy.get(), 2);
    assert!(record.doc().is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_for_closed_record_is_ignored() {
    let clock = Arc::new(FixedClock::default());
    let mut queue = TickQueue::new();
    let context = DocContext::new(clock.clone()).with_ticks(queue.sender());

    let player = Doc::<Player>::with_context(&context).unwrap();
    assert_eq!(queue.targets(), 1);
    player.energy.set(2).unwrap();
    player.close();
    assert_eq!(queue.targets(), 0);
    drop(player);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(queue.apply_pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_document_leaves_no_target() {
    let clock = Arc::new(FixedClock::default());
    let mut queue = TickQueue::new();
    let context = DocContext::new(clock.clone()).with_ticks(queue.sender());

    let player = Doc::<Player>::with_context(&context).unwrap();
    player.energy.set(2).unwrap();
    let other = Doc::<Player>::with_context(&context).unwrap();
    assert_eq!(queue.targets(), 2);

    drop(player);
    assert_eq!(queue.targets(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(queue.apply_pending(), 0);
    assert_eq!(other.energy.get(), ENERGY_MAX);
    assert_eq!(queue.targets(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hooks_fire_on_ticks() {
    use std::{cell::Cell, rc::Rc};

    let clock = Arc::new(FixedClock::default());
    let mut record = player_record(&clock);
    let ticks = Rc::new(Cell::new(0));
    let seen = ticks.clone();
    record.doc().energy.on_change(move |change| {
        if change.param.is_none() {
            seen.set(seen.get() + 1);
        }
    });

    record.doc().energy.set(5).unwrap();
    for _ in 0..3 {
        clock.advance(1_000);
        assert!(record.next_tick().await);
    }
    assert_eq!(ticks.get(), 4);
    assert_eq!(record.doc().energy.get(), 8);
}
