//! Subcommand implementations.

pub mod mutate;
pub mod regen;
pub mod show;
