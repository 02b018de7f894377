use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use super::{
    Doc, Schema,
    decode::{DecodeFailure, DecodeReport, decode_fields},
    errors::FieldError,
    field::{DocParent, FieldBase, FieldKind, FieldNode, ObjectNode, full_document, impl_field_handle},
    node::DocNode,
};
use crate::{raw::RawPayload, value::Value};

pub(crate) struct ObjectCell<D: Schema> {
    base: FieldBase,
    me: Weak<ObjectCell<D>>,
    inner: RefCell<Doc<D>>,
    /// Set when the stored sub-document is replaced or removed; the next
    /// flush writes the embedded document whole.
    rewrite: Cell<bool>,
}

impl<D: Schema> ObjectCell<D> {
    pub(crate) fn new(name: &str, owner: &Rc<DocNode>) -> Result<Rc<Self>, FieldError> {
        let inner = Doc::<D>::build(owner.context())?;
        let cell = Rc::new_cyclic(|me| Self {
            base: FieldBase::new(name, FieldKind::Object, owner),
            me: me.clone(),
            inner: RefCell::new(inner),
            rewrite: Cell::new(false),
        });
        cell.attach(&cell.inner.borrow());
        Ok(cell)
    }

    fn attach(&self, doc: &Doc<D>) {
        let parent: Weak<dyn DocParent> = self.me.clone();
        doc.node().set_parent(parent);
    }

    fn inner(&self) -> Doc<D> {
        self.inner.borrow().clone()
    }
}

impl<D: Schema> FieldNode for ObjectCell<D> {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn full_value(&self) -> Result<Value, FieldError> {
        full_document(self.inner().node()).map(Value::Document)
    }

    fn decode(&self, payload: RawPayload<'_>, report: &mut DecodeReport) -> Result<(), DecodeFailure> {
        let found = payload.element_type();
        let RawPayload::Document(mut reader) = payload else {
            return Err(self.base.conversion_error(found.name()).into());
        };
        decode_fields(self.inner().node(), reader.as_mut(), report)?;
        Ok(())
    }

    fn reset(&self) {
        self.inner().node().reset();
    }

    fn clear_dirty(&self) {
        // A rewrite pending from an unset lasts until the object is written.
        if self.base.is_dirty() {
            self.rewrite.set(false);
        }
        self.base.clear_dirty();
        self.inner().node().clear_dirty();
    }

    fn close(&self) {
        self.base.close();
        self.inner().node().close();
    }
}

impl<D: Schema> ObjectNode for ObjectCell<D> {
    fn field(&self) -> &dyn FieldNode {
        self
    }

    fn inner_node(&self) -> Rc<DocNode> {
        self.inner().node().clone()
    }

    fn rewrites(&self) -> bool {
        self.rewrite.get()
    }
}

impl<D: Schema> DocParent for ObjectCell<D> {
    fn child_dirty(&self, _child: &DocNode) {
        self.base.mark_dirty();
    }

    fn child_path(&self, _child: &DocNode) -> String {
        self.base.full_path()
    }

    fn record_unset(&self, path: String) {
        self.base.forward_unset(path);
    }
}

/// Handle to a field owning one embedded document.
pub struct Object<D: Schema> {
    cell: Rc<ObjectCell<D>>,
}

impl<D: Schema> Clone for Object<D> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<D: Schema> Object<D> {
    pub(crate) fn new(cell: Rc<ObjectCell<D>>) -> Self {
        Self { cell }
    }

    /// The embedded document. Mutations through it mark this field dirty.
    pub fn get(&self) -> Doc<D> {
        self.cell.inner()
    }

    /// Replaces the embedded document wholesale.
    ///
    /// `doc` must be a detached, open document; the previous one is closed.
    pub fn set(&self, doc: Doc<D>) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        doc.node().ensure_open()?;
        if doc.node().is_attached() {
            return Err(FieldError::AlreadyAttached {
                field: cell.base.full_path(),
            });
        }
        cell.attach(&doc);
        let previous = cell.inner.replace(doc);
        previous.node().close();
        cell.rewrite.set(true);
        cell.base.mark_dirty();
        Ok(())
    }

    /// Resets the embedded document to its defaults and schedules the
    /// field's path for removal.
    pub fn unset(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let inner = cell.inner();
        inner.node().reset();
        inner.node().clear_dirty();
        cell.base.clear_dirty();
        cell.rewrite.set(true);
        cell.base.record_unset();
        Ok(())
    }
}

impl_field_handle!(Object<D: Schema>);
