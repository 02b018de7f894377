use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::{debug, warn};

use super::{
    Doc, DocContext, Schema,
    decode::{DecodeFailure, DecodeReport, decode_fields},
    errors::FieldError,
    field::{DocParent, FieldBase, FieldKind, FieldNode, MapNode, full_document, impl_field_handle},
    node::DocNode,
    path,
    primitive::{IntegerKey, MapKey},
};
use crate::{
    raw::{RawPayload, RawReader},
    value::{Document, Value},
};

pub(crate) struct MapCell<K: MapKey, D: Schema> {
    base: FieldBase,
    me: Weak<MapCell<K, D>>,
    context: DocContext,
    entries: RefCell<Vec<(K, Doc<D>)>>,
    /// Keys whose entry changed since the last flush, in order of change.
    changed: RefCell<Vec<K>>,
    /// The whole map must be written at the next flush.
    rewrite: Cell<bool>,
    /// The stored map was unset during this cycle.
    removed: Cell<bool>,
}

impl<K: MapKey, D: Schema> MapCell<K, D> {
    pub(crate) fn new(name: &str, owner: &Rc<DocNode>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            base: FieldBase::new(name, FieldKind::Map, owner),
            me: me.clone(),
            context: owner.context().clone(),
            entries: RefCell::new(Vec::new()),
            changed: RefCell::new(Vec::new()),
            rewrite: Cell::new(false),
            removed: Cell::new(false),
        })
    }

    fn attach(&self, doc: &Doc<D>) {
        let parent: Weak<dyn DocParent> = self.me.clone();
        doc.node().set_parent(parent);
    }

    fn segment(&self, key: &K) -> Result<String, FieldError> {
        let segment = key.to_segment();
        path::check_segment(&segment).map_err(|reason| FieldError::InvalidKey {
            field: self.base.full_path(),
            key: segment.clone(),
            reason: reason.to_string(),
        })?;
        Ok(segment)
    }

    fn note_changed(&self, key: &K) {
        let mut changed = self.changed.borrow_mut();
        if !changed.contains(key) {
            changed.push(key.clone());
        }
    }

    /// Finds the key of an entry by document identity.
    fn key_of(&self, child: &DocNode) -> Option<K> {
        self.entries
            .borrow()
            .iter()
            .find(|(_, doc)| std::ptr::eq(doc.node().as_ref(), child))
            .map(|(key, _)| key.clone())
    }

    fn get(&self, key: &K) -> Option<Doc<D>> {
        self.entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, doc)| doc.clone())
    }

    /// Detaches and closes every entry.
    fn drain(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for (_, doc) in entries {
            doc.node().close();
        }
        self.changed.borrow_mut().clear();
    }

    /// Decodes each element as a keyed entry, attaching entries as they are
    /// read so nested paths resolve under the map.
    fn decode_entries<'a>(
        &self,
        reader: &mut (dyn RawReader<'a> + 'a),
        report: &mut DecodeReport,
    ) -> Result<(), DecodeFailure> {
        let map_path = self.base.full_path();
        while let Some(element) = reader.next_element()? {
            let entry_path = path::join(&map_path, &element.name);
            let Some(key) = K::from_segment(&element.name) else {
                let err = FieldError::InvalidKey {
                    field: map_path.clone(),
                    key: element.name.clone(),
                    reason: "key does not parse".to_string(),
                };
                warn!(path = %entry_path, error = %err, "skipping map entry");
                report.errors.push(err);
                continue;
            };
            let entry_type = element.payload.element_type();
            let RawPayload::Document(mut entry_reader) = element.payload else {
                let err = FieldError::ConversionError {
                    field: entry_path.clone(),
                    expected: "document".to_string(),
                    found: entry_type.to_string(),
                };
                warn!(path = %entry_path, error = %err, "skipping map entry");
                report.errors.push(err);
                continue;
            };

            let entry = Doc::<D>::build(&self.context)?;
            self.attach(&entry);
            let replaced = {
                let mut entries = self.entries.borrow_mut();
                let position = entries.iter().position(|(k, _)| k == &key);
                let replaced = position.map(|i| entries.remove(i));
                entries.push((key, entry.clone()));
                replaced
            };
            if let Some((_, old)) = replaced {
                old.node().close();
            }
            decode_fields(entry.node(), entry_reader.as_mut(), report)?;
        }
        Ok(())
    }
}

impl<K: MapKey, D: Schema> FieldNode for MapCell<K, D> {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn full_value(&self) -> Result<Value, FieldError> {
        let entries = self.entries.borrow().clone();
        let mut document = Document::new();
        for (key, doc) in entries {
            document.insert(key.to_segment(), full_document(doc.node())?);
        }
        Ok(Value::Document(document))
    }

    fn decode(&self, payload: RawPayload<'_>, report: &mut DecodeReport) -> Result<(), DecodeFailure> {
        let found = payload.element_type();
        let RawPayload::Document(mut reader) = payload else {
            return Err(self.base.conversion_error(found.name()).into());
        };

        let previous = std::mem::take(&mut *self.entries.borrow_mut());
        self.changed.borrow_mut().clear();
        let (stale, result) = match self.decode_entries(reader.as_mut(), report) {
            Ok(()) => (previous, Ok(())),
            Err(err) => (self.entries.replace(previous), Err(err)),
        };
        for (_, doc) in stale {
            doc.node().close();
        }
        debug!(path = %self.base.full_path(), entries = self.entries.borrow().len(), "decoded map");
        result
    }

    fn reset(&self) {
        self.drain();
    }

    fn clear_dirty(&self) {
        self.base.clear_dirty();
        self.rewrite.set(false);
        self.removed.set(false);
        self.changed.borrow_mut().clear();
        let entries = self.entries.borrow().clone();
        for (_, doc) in entries {
            doc.node().clear_dirty();
        }
    }

    fn close(&self) {
        self.base.close();
        self.drain();
    }
}

impl<K: MapKey, D: Schema> MapNode for MapCell<K, D> {
    fn field(&self) -> &dyn FieldNode {
        self
    }

    fn rewrites(&self) -> bool {
        self.rewrite.get()
    }

    fn changed_entries(&self) -> Vec<(String, Rc<DocNode>)> {
        let map_path = self.base.full_path();
        let changed = self.changed.borrow().clone();
        changed
            .iter()
            .filter_map(|key| {
                self.get(key)
                    .map(|doc| (path::join(&map_path, &key.to_segment()), doc.node().clone()))
            })
            .collect()
    }
}

impl<K: MapKey, D: Schema> DocParent for MapCell<K, D> {
    fn child_dirty(&self, child: &DocNode) {
        if let Some(key) = self.key_of(child) {
            self.note_changed(&key);
        }
        self.base.mark_dirty();
    }

    fn child_path(&self, child: &DocNode) -> String {
        let map_path = self.base.full_path();
        match self.key_of(child) {
            Some(key) => path::join(&map_path, &key.to_segment()),
            None => map_path,
        }
    }

    fn record_unset(&self, path: String) {
        self.base.forward_unset(path);
    }
}

/// Handle to a keyed collection of embedded documents.
///
/// A change anywhere inside an entry records the entry's key; the next
/// incremental flush rewrites each changed entry whole at `map.key`.
pub struct Map<K: MapKey, D: Schema> {
    cell: Rc<MapCell<K, D>>,
}

impl<K: MapKey, D: Schema> Clone for Map<K, D> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<K: MapKey, D: Schema> Map<K, D> {
    pub(crate) fn new(cell: Rc<MapCell<K, D>>) -> Self {
        Self { cell }
    }

    pub fn len(&self) -> usize {
        self.cell.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.entries.borrow().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.cell.entries.borrow().iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &K) -> Option<Doc<D>> {
        self.cell.get(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<K> {
        self.cell
            .entries
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<(K, Doc<D>)> {
        self.cell.entries.borrow().clone()
    }

    /// First entry matching `predicate`, in insertion order.
    pub fn find_one(&self, predicate: impl Fn(&K, &Doc<D>) -> bool) -> Option<(K, Doc<D>)> {
        self.entries().into_iter().find(|(k, d)| predicate(k, d))
    }

    pub fn find_all(&self, predicate: impl Fn(&K, &Doc<D>) -> bool) -> Vec<(K, Doc<D>)> {
        self.entries()
            .into_iter()
            .filter(|(k, d)| predicate(k, d))
            .collect()
    }

    /// Attaches `doc` under `key`, replacing and closing any existing entry.
    pub fn insert(&self, key: K, doc: Doc<D>) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.segment(&key)?;
        doc.node().ensure_open()?;
        if doc.node().is_attached() {
            return Err(FieldError::AlreadyAttached {
                field: cell.base.full_path(),
            });
        }

        cell.attach(&doc);
        let replaced = {
            let mut entries = cell.entries.borrow_mut();
            match entries.iter_mut().find(|(k, _)| k == &key) {
                Some((_, existing)) => Some(std::mem::replace(existing, doc)),
                None => {
                    entries.push((key.clone(), doc));
                    None
                }
            }
        };
        if let Some(old) = replaced {
            old.node().close();
        }

        if cell.removed.get() {
            cell.rewrite.set(true);
        }
        cell.note_changed(&key);
        cell.base.mark_dirty();
        Ok(())
    }

    /// Inserts a fresh default entry under `key` and returns it.
    pub fn insert_new(&self, key: K) -> Result<Doc<D>, FieldError> {
        self.cell.base.ensure_open()?;
        let doc = Doc::<D>::build(&self.cell.context)?;
        self.insert(key, doc.clone())?;
        Ok(doc)
    }

    /// Returns the entry under `key`, inserting a default one if absent.
    pub fn get_or_insert(&self, key: K) -> Result<Doc<D>, FieldError> {
        match self.get(&key) {
            Some(doc) => Ok(doc),
            None => self.insert_new(key),
        }
    }

    /// Removes and closes an entry, scheduling `map.key` for removal.
    pub fn remove(&self, key: &K) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let segment = cell.segment(key)?;
        let removed = {
            let mut entries = cell.entries.borrow_mut();
            let position = entries.iter().position(|(k, _)| k == key);
            position.map(|i| entries.remove(i))
        };
        let Some((_, doc)) = removed else {
            return Err(FieldError::MissingEntry {
                field: cell.base.full_path(),
                key: segment,
            });
        };
        doc.node().close();
        cell.changed.borrow_mut().retain(|k| k != key);
        cell.base
            .forward_unset(path::join(&cell.base.full_path(), &segment));
        Ok(())
    }

    /// Removes every entry; the next flush writes the map whole.
    pub fn clear(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.drain();
        cell.rewrite.set(true);
        cell.base.mark_dirty();
        Ok(())
    }

    /// Replaces every entry.
    pub fn set_all(&self, entries: Vec<(K, Doc<D>)>) -> Result<(), FieldError> {
        for (key, _) in &entries {
            self.cell.segment(key)?;
        }
        self.clear()?;
        for (key, doc) in entries {
            self.insert(key, doc)?;
        }
        Ok(())
    }

    /// Removes every entry and schedules the map's path for removal.
    pub fn unset(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.drain();
        cell.rewrite.set(false);
        cell.removed.set(true);
        cell.base.clear_dirty();
        cell.base.record_unset();
        Ok(())
    }
}

impl<K: IntegerKey, D: Schema> Map<K, D> {
    /// One past the largest key, and at least 1.
    pub fn next_int_key(&self) -> Option<K> {
        let max = self
            .cell
            .entries
            .borrow()
            .iter()
            .map(|(k, _)| k.to_i128())
            .max()
            .unwrap_or(0);
        K::from_i128(max.max(0) + 1)
    }
}

impl_field_handle!(Map<K: MapKey, D: Schema>);
