//! A document bound to one stored record.
//!
//! [`Record`] pairs a [`Doc`] with the collection and key it persists under,
//! and owns the [`TickQueue`] its regenerating fields report to. It is the
//! single owner the document tree expects: load, mutate through
//! [`Record::doc`], then [`save`](Record::save) writes only what changed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Clock, Result,
    constants::DEFAULT_KEY_FIELD,
    doc::{DecodeReport, Doc, DocContext, Field, FlushMode, Schema, TickQueue},
    raw::ValueReader,
    store::{MatchKey, Storage},
    value::Value,
};

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}

/// Where a record lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOptions {
    pub collection: String,
    /// The field identifying the record within its collection.
    #[serde(default = "default_key_field")]
    pub key_field: String,
}

impl RecordOptions {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key_field: default_key_field(),
        }
    }

    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }
}

/// A typed document bound to a collection and key.
pub struct Record<S: Schema> {
    options: RecordOptions,
    key: MatchKey,
    doc: Doc<S>,
    ticks: TickQueue,
    persisted: bool,
}

impl<S: Schema> Record<S> {
    /// Creates an empty record. Nothing is read or written yet.
    pub fn new(options: RecordOptions, key: impl Into<Value>, clock: Arc<dyn Clock>) -> Result<Self> {
        let ticks = TickQueue::new();
        let context = DocContext::new(clock).with_ticks(ticks.sender());
        let doc = Doc::with_context(&context)?;
        let key = MatchKey::new(options.key_field.clone(), key);
        Ok(Self {
            options,
            key,
            doc,
            ticks,
            persisted: false,
        })
    }

    pub fn doc(&self) -> &Doc<S> {
        &self.doc
    }

    pub fn key(&self) -> &MatchKey {
        &self.key
    }

    pub fn options(&self) -> &RecordOptions {
        &self.options
    }

    /// Whether the record is known to exist in storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Reads the stored record into the document.
    ///
    /// Returns `None`, leaving the document untouched, if nothing is stored
    /// under the key.
    pub fn load(&mut self, store: &dyn Storage) -> Result<Option<DecodeReport>> {
        let Some(stored) = store.load(&self.options.collection, &self.key)? else {
            debug!(collection = %self.options.collection, key = %self.key, "no stored record");
            return Ok(None);
        };
        let mut reader = ValueReader::new(&stored);
        let mut report = self.doc.deserialize(&mut reader)?;
        report.skipped.retain(|name| *name != self.key.field);
        self.persisted = true;
        debug!(
            collection = %self.options.collection,
            key = %self.key,
            errors = report.errors.len(),
            "loaded record"
        );
        Ok(Some(report))
    }

    /// Writes the full document, replacing whatever is stored under the key.
    pub fn insert(&mut self, store: &dyn Storage) -> Result<()> {
        let changes = self.doc.pending_changes(FlushMode::Full)?;
        store.write_full(&self.options.collection, &self.key, &changes.to_document()?)?;
        self.doc.mark_clean();
        self.persisted = true;
        info!(collection = %self.options.collection, key = %self.key, "inserted record");
        Ok(())
    }

    /// Writes the pending changes. Returns false if there were none.
    ///
    /// A record never written before is inserted whole. The document stays
    /// dirty if the write fails.
    pub fn save(&mut self, store: &dyn Storage) -> Result<bool> {
        if !self.persisted {
            self.insert(store)?;
            return Ok(true);
        }
        let changes = self.doc.pending_changes(FlushMode::Incremental)?;
        if changes.is_empty() {
            return Ok(false);
        }
        store.write_changes(&self.options.collection, &self.key, &changes.set, &changes.unset)?;
        self.doc.mark_clean();
        debug!(
            collection = %self.options.collection,
            key = %self.key,
            set = changes.set.len(),
            unset = changes.unset.len(),
            "saved record"
        );
        Ok(true)
    }

    /// Writes one field's full value at its path, leaving other pending
    /// changes (and the field's dirty flag) in place.
    pub fn update_field(&self, store: &dyn Storage, field: &dyn Field) -> Result<()> {
        let set = [(field.full_path(), field.to_value()?)];
        store.write_changes(&self.options.collection, &self.key, &set, &[])?;
        debug!(collection = %self.options.collection, path = %set[0].0, "updated field");
        Ok(())
    }

    /// Removes the stored record. Returns false if none was stored.
    pub fn delete(&mut self, store: &dyn Storage) -> Result<bool> {
        let removed = store.delete(&self.options.collection, &self.key)?;
        self.persisted = false;
        Ok(removed)
    }

    /// Applies every regeneration tick already delivered.
    pub fn apply_ticks(&mut self) -> usize {
        self.ticks.apply_pending()
    }

    /// Waits for the next regeneration tick and applies it.
    pub async fn next_tick(&mut self) -> bool {
        self.ticks.apply_next().await
    }

    /// Closes the document. The record cannot be used afterwards.
    pub fn close(self) {
        self.doc.close();
    }
}

impl<S: Schema> std::fmt::Debug for Record<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("options", &self.options)
            .field("key", &self.key)
            .field("persisted", &self.persisted)
            .field("doc", &self.doc)
            .finish()
    }
}
