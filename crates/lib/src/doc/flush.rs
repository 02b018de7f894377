//! Snapshot and incremental change-set computation.
//!
//! Incremental policy per field kind:
//!
//! | Kind           | Emitted when dirty                                   |
//! |----------------|------------------------------------------------------|
//! | scalar         | `(path, value)`                                      |
//! | time-restoring | `(path, {val, maxval, utime, tick})`                 |
//! | array          | `(path, whole array)`                                |
//! | object         | its document's own changes, or the whole document if it was replaced |
//! | map            | `(path.key, whole entry)` per changed key, or the whole map after a wholesale change |

use tracing::debug;

use super::{
    errors::FieldError,
    field::{FieldSlot, full_document},
    node::DocNode,
    path,
};
use crate::value::{Document, PathConflict, Value};

/// Whether a flush writes everything or only what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    Full,
    Incremental,
}

/// The result of a flush: values to write and paths to remove.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub mode: FlushMode,
    /// `(dotted path, value)` pairs. In full mode the paths are the
    /// top-level field names in declaration order.
    pub set: Vec<(String, Value)>,
    /// Dotted paths to remove, each listed once.
    pub unset: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Looks up the value written at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.set.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    /// Folds the set entries into one value tree.
    pub fn to_document(&self) -> Result<Document, PathConflict> {
        let mut document = Document::new();
        for (path, value) in &self.set {
            document.set_path(path, value.clone())?;
        }
        Ok(document)
    }
}

/// Computes the change-set for a root document without touching dirty state.
pub(crate) fn collect(root: &DocNode, mode: FlushMode) -> Result<ChangeSet, FieldError> {
    let set = match mode {
        FlushMode::Full => full_document(root)?.into_iter().collect(),
        FlushMode::Incremental => {
            let mut set = Vec::new();
            collect_dirty(root, &mut set)?;
            set
        }
    };

    let pending = root.peek_unset();
    let unset = pending
        .iter()
        .filter(|u| !set.iter().any(|(p, _)| path::is_within(u, p)))
        .filter(|u| !pending.iter().any(|other| other != *u && path::is_within(u, other)))
        .cloned()
        .collect();

    let changes = ChangeSet { mode, set, unset };
    debug!(
        mode = ?changes.mode,
        set = changes.set.len(),
        unset = changes.unset.len(),
        "computed change-set"
    );
    Ok(changes)
}

fn collect_dirty(node: &DocNode, out: &mut Vec<(String, Value)>) -> Result<(), FieldError> {
    for slot in node.slots() {
        let field = slot.node();
        if !field.base().is_dirty() {
            continue;
        }
        match &slot {
            FieldSlot::Scalar(_) | FieldSlot::Array(_) | FieldSlot::TimeRestoring(_) => {
                out.push((field.base().full_path(), field.full_value()?));
            }
            FieldSlot::Object(object) => {
                if object.rewrites() {
                    out.push((field.base().full_path(), field.full_value()?));
                } else {
                    collect_dirty(&object.inner_node(), out)?;
                }
            }
            FieldSlot::Map(map) => {
                if map.rewrites() {
                    out.push((field.base().full_path(), field.full_value()?));
                } else {
                    for (entry_path, entry) in map.changed_entries() {
                        out.push((entry_path, Value::Document(full_document(&entry)?)));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Clears every dirty flag and drains the unset list.
pub(crate) fn mark_clean(root: &DocNode) {
    root.clear_dirty();
    root.take_unset();
}
