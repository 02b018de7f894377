//! The demo player schema.

use std::time::Duration;

use docfields::doc::{
    Array, FieldError, Map, Object, Registrar, RestoreConfig, Scalar, Schema, TimeRestoring,
};

pub const PLAYERS: &str = "players";
pub const MAX_HP: i32 = 100;
pub const MAX_ENERGY: i64 = 20;
pub const ENERGY_INTERVAL: Duration = Duration::from_secs(30);

pub struct Player {
    pub name: Scalar<String>,
    pub hp: Scalar<i32>,
    pub stats: Object<Stats>,
    pub badges: Array<String>,
    pub inventory: Map<String, Item>,
    pub energy: TimeRestoring,
}

impl Schema for Player {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            name: fields.scalar("name")?,
            hp: fields.scalar("hp")?,
            stats: fields.object("stats")?,
            badges: fields.array("badges")?,
            inventory: fields.map("inv")?,
            energy: fields.time_restoring(
                "energy",
                RestoreConfig::new(MAX_ENERGY, ENERGY_INTERVAL),
            )?,
        })
    }
}

pub struct Stats {
    pub damage_taken: Scalar<i64>,
    pub items_granted: Scalar<i64>,
}

impl Schema for Stats {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            damage_taken: fields.scalar("dmg")?,
            items_granted: fields.scalar("granted")?,
        })
    }
}

pub struct Item {
    pub qty: Scalar<i32>,
}

impl Schema for Item {
    fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            qty: fields.scalar("qty")?,
        })
    }
}
