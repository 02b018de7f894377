//! In-memory storage backend.
//!
//! Records live in per-collection vectors behind a `RwLock`. The whole state
//! can be saved to and loaded from a JSON file, which is enough for tests,
//! tools and small single-process deployments.

use std::{
    collections::HashMap,
    path::Path,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;
use tracing::{debug, trace};

use super::{MatchKey, Storage, StoreError};
use crate::{
    Error, Result,
    value::{
        Document, Value,
        json::{document_from_json, document_to_json},
    },
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// On-disk layout: records as extended JSON, grouped by collection.
#[derive(Serialize, Deserialize)]
struct SerializableStore {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    collections: HashMap<String, Vec<Json>>,
}

/// A [`Storage`] keeping every record in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .read()
            .map_err(|_| Error::from(StoreError::LockPoisoned))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .write()
            .map_err(|_| Error::from(StoreError::LockPoisoned))
    }

    /// Every record of a collection, in insertion order.
    pub fn records(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self.read()?.get(collection).cloned().unwrap_or_default())
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }

    /// Names of all collections holding at least one record.
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .read()?
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Inserts a new record, failing if one with the same key exists.
    pub fn insert(&self, collection: &str, key: &MatchKey, doc: &Document) -> Result<()> {
        let mut collections = self.write()?;
        let records = collections.entry(collection.to_string()).or_default();
        if records.iter().any(|record| key.matches(record)) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                key: key.to_string(),
            }
            .into());
        }
        records.push(with_key(doc.clone(), key));
        Ok(())
    }

    /// Saves every collection to `path` as JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let collections = self
            .read()?
            .iter()
            .map(|(name, records)| (name.clone(), records.iter().map(document_to_json).collect()))
            .collect();
        let serializable = SerializableStore {
            version: PERSISTENCE_VERSION,
            collections,
        };

        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| -> Error { StoreError::SerializationFailed { source: e }.into() })?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| -> Error { StoreError::FileIo { source: e }.into() })?;
        debug!(path = %path.as_ref().display(), "saved store");
        Ok(())
    }

    /// Loads a store saved by [`save_to_file`](Self::save_to_file).
    ///
    /// A missing file yields an empty store.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = match std::fs::read_to_string(path.as_ref()) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(StoreError::FileIo { source: e }.into()),
        };
        let serializable: SerializableStore = serde_json::from_str(&json)
            .map_err(|e| -> Error { StoreError::DeserializationFailed { source: e }.into() })?;

        let mut collections = HashMap::with_capacity(serializable.collections.len());
        for (name, records) in serializable.collections {
            let mut docs = Vec::with_capacity(records.len());
            for record in records {
                let Json::Object(map) = record else {
                    return Err(StoreError::Corrupt {
                        reason: format!("record in '{name}' is not an object"),
                    }
                    .into());
                };
                let doc = document_from_json(&map).map_err(|e| -> Error {
                    StoreError::Corrupt {
                        reason: format!("record in '{name}': {e}"),
                    }
                    .into()
                })?;
                docs.push(doc);
            }
            collections.insert(name, docs);
        }
        debug!(path = %path.as_ref().display(), collections = collections.len(), "loaded store");
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }
}

fn with_key(mut doc: Document, key: &MatchKey) -> Document {
    if !doc.contains_key(&key.field) {
        doc.insert(key.field.clone(), key.value.clone());
    }
    doc
}

impl Storage for InMemoryStore {
    fn load(&self, collection: &str, key: &MatchKey) -> Result<Option<Document>> {
        Ok(self
            .read()?
            .get(collection)
            .and_then(|records| records.iter().find(|record| key.matches(record)))
            .cloned())
    }

    fn write_full(&self, collection: &str, key: &MatchKey, doc: &Document) -> Result<()> {
        let mut collections = self.write()?;
        let records = collections.entry(collection.to_string()).or_default();
        let doc = with_key(doc.clone(), key);
        match records.iter_mut().find(|record| key.matches(record)) {
            Some(record) => *record = doc,
            None => records.push(doc),
        }
        trace!(collection, key = %key, "wrote full record");
        Ok(())
    }

    fn write_changes(&self, collection: &str, key: &MatchKey, set: &[(String, Value)], unset: &[String]) -> Result<()> {
        let mut collections = self.write()?;
        let records = collections.entry(collection.to_string()).or_default();
        let position = records.iter().position(|record| key.matches(record));

        // Applied to a copy so a failing path leaves the record untouched.
        let mut updated = match position {
            Some(index) => records[index].clone(),
            None => with_key(Document::new(), key),
        };
        for (path, value) in set {
            updated
                .set_path(path, value.clone())
                .map_err(|_| -> Error {
                    StoreError::InvalidPath {
                        collection: collection.to_string(),
                        path: path.clone(),
                    }
                    .into()
                })?;
        }
        for path in unset {
            updated.remove_path(path);
        }

        match position {
            Some(index) => records[index] = updated,
            None => records.push(updated),
        }
        trace!(
            collection,
            key = %key,
            set = set.len(),
            unset = unset.len(),
            "applied changes"
        );
        Ok(())
    }

    fn delete(&self, collection: &str, key: &MatchKey) -> Result<bool> {
        let mut collections = self.write()?;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|record| !key.matches(record));
        Ok(records.len() != before)
    }
}
