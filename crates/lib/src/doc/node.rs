use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::trace;

use super::{
    DocContext,
    errors::FieldError,
    field::{DocParent, FieldSlot},
};

/// The untyped half of a document: the ordered field slots, dirty state, the
/// parent link and, at the root, the unset list.
pub(crate) struct DocNode {
    fields: RefCell<Vec<(String, FieldSlot)>>,
    dirty: Cell<bool>,
    closed: Cell<bool>,
    parent: RefCell<Option<Weak<dyn DocParent>>>,
    unset: RefCell<Vec<String>>,
    context: DocContext,
}

impl DocNode {
    pub(crate) fn new(context: DocContext) -> Rc<Self> {
        Rc::new(Self {
            fields: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            closed: Cell::new(false),
            parent: RefCell::new(None),
            unset: RefCell::new(Vec::new()),
            context,
        })
    }

    pub(crate) fn context(&self) -> &DocContext {
        &self.context
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.fields.borrow().iter().any(|(n, _)| n == name)
    }

    pub(crate) fn register(&self, name: &str, slot: FieldSlot) -> Result<(), FieldError> {
        if self.contains(name) {
            return Err(FieldError::DuplicateField {
                name: name.to_string(),
            });
        }
        trace!(field = name, "registered field");
        self.fields.borrow_mut().push((name.to_string(), slot));
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub(crate) fn slot(&self, name: &str) -> Option<FieldSlot> {
        self.fields
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot.clone())
    }

    /// Snapshot of the slots, so callers can recurse without holding a borrow.
    pub(crate) fn slots(&self) -> Vec<FieldSlot> {
        self.fields
            .borrow()
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect()
    }

    pub(crate) fn named_slots(&self) -> Vec<(String, FieldSlot)> {
        self.fields.borrow().clone()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Sets the dirty flag and forwards to the parent container, if any.
    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
        if let Some(parent) = self.parent() {
            parent.child_dirty(self);
        }
    }

    fn parent(&self) -> Option<Rc<dyn DocParent>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_parent(&self, parent: Weak<dyn DocParent>) {
        *self.parent.borrow_mut() = Some(parent);
    }

    pub(crate) fn detach(&self) {
        *self.parent.borrow_mut() = None;
    }

    /// Returns true while a live container owns this document.
    pub(crate) fn is_attached(&self) -> bool {
        self.parent().is_some()
    }

    /// Dotted path from the root; the root itself is `""`.
    pub(crate) fn full_path(&self) -> String {
        match self.parent() {
            Some(parent) => parent.child_path(self),
            None => String::new(),
        }
    }

    /// Routes an unset path to the root, which keeps each path once.
    pub(crate) fn record_unset(&self, path: String) {
        match self.parent() {
            Some(parent) => parent.record_unset(path),
            None => {
                let mut unset = self.unset.borrow_mut();
                if !unset.contains(&path) {
                    trace!(path = %path, "recorded unset path");
                    unset.push(path);
                }
            }
        }
    }

    pub(crate) fn peek_unset(&self) -> Vec<String> {
        self.unset.borrow().clone()
    }

    pub(crate) fn take_unset(&self) -> Vec<String> {
        std::mem::take(&mut *self.unset.borrow_mut())
    }

    /// Clears dirty state on this document and every field below it.
    pub(crate) fn clear_dirty(&self) {
        self.dirty.set(false);
        for slot in self.slots() {
            slot.node().clear_dirty();
        }
    }

    /// Resets every field to its default.
    pub(crate) fn reset(&self) {
        for slot in self.slots() {
            slot.node().reset();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn ensure_open(&self) -> Result<(), FieldError> {
        if self.closed.get() {
            Err(FieldError::UseAfterClose {
                field: self.full_path(),
            })
        } else {
            Ok(())
        }
    }

    /// Closes every field and releases them. Closing twice is a no-op.
    pub(crate) fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        let fields = std::mem::take(&mut *self.fields.borrow_mut());
        for (_, slot) in &fields {
            slot.node().close();
        }
        self.dirty.set(false);
        self.unset.borrow_mut().clear();
        self.detach();
    }
}
