use std::{sync::Arc, time::Duration};

use docfields::{
    FixedClock,
    doc::{
        Array, Doc, DocContext, FieldError, FlushMode, Map, Object, Registrar, RestoreConfig,
        Scalar, Schema, TimeRestoring,
    },
    primitive_enum,
};

// ==========================
// SHARED SCHEMAS
// ==========================

primitive_enum! {
    pub enum Class { Warrior, Mage, Rogue }
}

pub struct Stats {
    pub level: Scalar<i32>,
    pub strength: Scalar<i32>,
}

impl Schema for Stats {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            level: fields.scalar("level")?,
            strength: fields.scalar("str")?,
        })
    }
}

pub struct Item {
    pub qty: Scalar<i32>,
    pub note: Scalar<String>,
}

impl Schema for Item {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            qty: fields.scalar("qty")?,
            note: fields.scalar("note")?,
        })
    }
}

pub const ENERGY_MAX: i64 = 10;
pub const ENERGY_INTERVAL: Duration = Duration::from_millis(1000);

pub struct Player {
    pub hp: Scalar<i32>,
    pub name: Scalar<String>,
    pub class: Scalar<Class>,
    pub stats: Object<Stats>,
    pub tags: Array<String>,
    pub inv: Map<String, Item>,
    pub energy: TimeRestoring,
}

impl Schema for Player {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            hp: fields.scalar("hp")?,
            name: fields.scalar("name")?,
            class: fields.scalar("class")?,
            stats: fields.object("stats")?,
            tags: fields.array("tags")?,
            inv: fields.map("inv")?,
            energy: fields
                .time_restoring("energy", RestoreConfig::new(ENERGY_MAX, ENERGY_INTERVAL))?,
        })
    }
}

pub struct Inner {
    pub value: Scalar<i64>,
}

impl Schema for Inner {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            value: fields.scalar("value")?,
        })
    }
}

pub struct Middle {
    pub inner: Object<Inner>,
    pub label: Scalar<String>,
}

impl Schema for Middle {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            inner: fields.object("inner")?,
            label: fields.scalar("label")?,
        })
    }
}

pub struct Outer {
    pub middle: Object<Middle>,
    pub count: Scalar<i32>,
}

impl Schema for Outer {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            middle: fields.object("middle")?,
            count: fields.scalar("count")?,
        })
    }
}

// ==========================
// FACTORIES
// ==========================

/// A clock frozen at its default instant, shared with the returned context.
pub fn fixed_context() -> (Arc<FixedClock>, DocContext) {
    let clock = Arc::new(FixedClock::default());
    let context = DocContext::new(clock.clone());
    (clock, context)
}

/// A player on a fixed clock, flushed once so it starts clean.
pub fn clean_player() -> (Arc<FixedClock>, Doc<Player>) {
    let (clock, context) = fixed_context();
    let player = Doc::<Player>::with_context(&context).expect("Failed to create player");
    player
        .serialize(FlushMode::Full)
        .expect("Failed initial flush");
    (clock, player)
}

/// Paths of an incremental flush's `set` list.
pub fn set_paths(changes: &docfields::doc::ChangeSet) -> Vec<&str> {
    changes.set.iter().map(|(path, _)| path.as_str()).collect()
}
