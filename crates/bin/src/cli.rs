//! CLI argument definitions for the docfields binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Drive a demo player record stored in a JSON file
#[derive(Parser, Debug)]
#[command(name = "docfields")]
#[command(about = "Docfields: typed documents that flush only what changed")]
#[command(version)]
pub struct Cli {
    /// JSON file holding the stored records
    #[arg(short = 'D', long, default_value = "docfields.json", env = "DOCFIELDS_DATA_FILE")]
    pub data_file: PathBuf,

    /// Key of the player record to operate on
    #[arg(short, long, default_value = "player-1", env = "DOCFIELDS_PLAYER")]
    pub player: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the whole player document
    Show,
    /// Lose hit points
    Damage(AmountArgs),
    /// Regain hit points, up to the maximum
    Heal(AmountArgs),
    /// Add items to the inventory
    Grant(GrantArgs),
    /// Remove an item from the inventory entirely
    Drop(ItemArgs),
    /// Spend regenerating energy
    Spend(AmountArgs),
    /// Add a badge
    Badge(NameArgs),
    /// Wait for live energy regeneration, saving after every tick
    Regen(RegenArgs),
}

#[derive(clap::Args, Debug)]
pub struct AmountArgs {
    pub amount: i32,
}

#[derive(clap::Args, Debug)]
pub struct GrantArgs {
    pub item: String,

    /// How many to add
    #[arg(short, long, default_value_t = 1)]
    pub qty: i32,
}

#[derive(clap::Args, Debug)]
pub struct ItemArgs {
    pub item: String,
}

#[derive(clap::Args, Debug)]
pub struct NameArgs {
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct RegenArgs {
    /// Give up after this many seconds
    #[arg(short, long, default_value_t = 60)]
    pub seconds: u64,
}
