//! Opening the JSON-backed store and the player record in it.

use std::{path::PathBuf, sync::Arc};

use docfields::{
    SystemClock,
    doc::{ChangeSet, FlushMode},
    record::{Record, RecordOptions},
    store::InMemoryStore,
};

use crate::{
    cli::Cli,
    player::{MAX_HP, PLAYERS, Player},
};

/// One loaded player record and the store it came from.
pub struct Session {
    store: InMemoryStore,
    data_file: PathBuf,
    pub record: Record<Player>,
}

impl Session {
    /// Loads the store file and the selected player, creating the player if needed.
    pub fn open(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let store = InMemoryStore::load_from_file(&cli.data_file)?;
        tracing::debug!(path = %cli.data_file.display(), "loaded store");

        let mut record: Record<Player> = Record::new(
            RecordOptions::new(PLAYERS),
            cli.player.clone(),
            Arc::new(SystemClock),
        )?;
        match record.load(&store)? {
            Some(report) => {
                for path in &report.skipped {
                    tracing::warn!(path = %path, "stored path not in the player schema");
                }
                for error in &report.errors {
                    tracing::warn!("kept default for a field: {error}");
                }
            }
            None => {
                tracing::info!(player = %cli.player, "creating new player");
                let doc = record.doc();
                doc.name.set(cli.player.clone())?;
                doc.hp.set(MAX_HP)?;
            }
        }

        Ok(Self {
            store,
            data_file: cli.data_file.clone(),
            record,
        })
    }

    /// Writes pending changes to the store and the store to disk.
    ///
    /// Returns what was written: the whole document for a new record,
    /// otherwise the incremental change-set.
    pub fn commit(&mut self) -> Result<ChangeSet, Box<dyn std::error::Error>> {
        let mode = if self.record.is_persisted() {
            FlushMode::Incremental
        } else {
            FlushMode::Full
        };
        let changes = self.record.doc().pending_changes(mode)?;
        if self.record.save(&self.store)? {
            self.store.save_to_file(&self.data_file)?;
            tracing::debug!(path = %self.data_file.display(), "saved store");
        }
        Ok(changes)
    }
}
