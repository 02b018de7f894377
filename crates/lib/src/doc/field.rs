//! Field kinds and the capability traits shared by every field variant.
//!
//! A document owns its fields through [`FieldSlot`], a closed enum with one
//! variant per field kind. Every variant exposes the common
//! [`FieldNode`] capabilities; objects and maps add the structural queries
//! the serializer needs through [`ObjectNode`] and [`MapNode`].
//!
//! Fields refer back to their owning document through a `Weak` link. That
//! link is only used to bubble dirty signals and to resolve paths.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use super::{decode::DecodeFailure, errors::FieldError, node::DocNode, path};
use crate::{
    raw::RawPayload,
    value::{Document, Value},
};

use super::decode::DecodeReport;

/// The kind a field was registered as. Fixed for the field's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Double,
    String,
    ObjectId,
    Bool,
    DateTime,
    Int32,
    Int64,
    Binary,
    Object,
    Array,
    Map,
    TimeRestoring,
}

impl FieldKind {
    /// Kinds that own nested state and have their own registration entry point.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FieldKind::Object | FieldKind::Array | FieldKind::Map | FieldKind::TimeRestoring
        )
    }

    /// Kinds whose change hooks receive the previous value.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Double | FieldKind::Int32 | FieldKind::Int64 | FieldKind::TimeRestoring
        )
    }

    /// Returns the kind name as a string
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::ObjectId => "objectId",
            FieldKind::Bool => "bool",
            FieldKind::DateTime => "date",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Binary => "binary",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::Map => "map",
            FieldKind::TimeRestoring => "timeRestoring",
        }
    }

    /// Returns true if `value` already has this kind's representation.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Double, Value::Double(_))
                | (FieldKind::String, Value::String(_))
                | (FieldKind::ObjectId, Value::ObjectId(_))
                | (FieldKind::Bool, Value::Bool(_))
                | (FieldKind::DateTime, Value::DateTime(_))
                | (FieldKind::Int32, Value::Int32(_))
                | (FieldKind::Int64, Value::Int64(_))
                | (FieldKind::Binary, Value::Binary(_))
                | (FieldKind::Object | FieldKind::Map | FieldKind::TimeRestoring, Value::Document(_))
                | (FieldKind::Array, Value::Array(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State every field carries: identity, dirty flag and the owner link.
pub(crate) struct FieldBase {
    name: String,
    kind: FieldKind,
    dirty: Cell<bool>,
    closed: Cell<bool>,
    owner: Weak<DocNode>,
}

impl FieldBase {
    pub(crate) fn new(name: &str, kind: FieldKind, owner: &Rc<DocNode>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            dirty: Cell::new(false),
            closed: Cell::new(false),
            owner: Rc::downgrade(owner),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> FieldKind {
        self.kind
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Sets the dirty flag and forwards the signal to the owning document.
    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
        if let Some(owner) = self.owner.upgrade() {
            owner.mark_dirty();
        }
    }

    pub(crate) fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    /// Dotted path from the root document.
    pub(crate) fn full_path(&self) -> String {
        match self.owner.upgrade() {
            Some(owner) => path::join(&owner.full_path(), &self.name),
            None => self.name.clone(),
        }
    }

    /// Records this field's path in the root's unset list.
    pub(crate) fn record_unset(&self) {
        self.forward_unset(self.full_path());
    }

    pub(crate) fn forward_unset(&self, path: String) {
        if let Some(owner) = self.owner.upgrade() {
            owner.record_unset(path);
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), FieldError> {
        if self.closed.get() {
            Err(FieldError::UseAfterClose {
                field: self.name.clone(),
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn close(&self) {
        self.closed.set(true);
        self.dirty.set(false);
    }

    pub(crate) fn conversion_error(&self, found: &str) -> FieldError {
        FieldError::ConversionError {
            field: self.full_path(),
            expected: self.kind.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn type_mismatch(&self, reason: impl fmt::Display) -> FieldError {
        FieldError::TypeMismatch {
            field: self.full_path(),
            reason: reason.to_string(),
        }
    }
}

/// Capabilities shared by every field variant.
pub(crate) trait FieldNode {
    fn base(&self) -> &FieldBase;

    /// The field's complete persisted value.
    fn full_value(&self) -> Result<Value, FieldError>;

    /// Replaces the field's state from a non-null payload.
    fn decode(&self, payload: RawPayload<'_>, report: &mut DecodeReport) -> Result<(), DecodeFailure>;

    /// Resets the field to its default state without marking it dirty.
    fn reset(&self);

    /// Clears dirty state here and below.
    fn clear_dirty(&self) {
        self.base().clear_dirty();
    }

    fn close(&self) {
        self.base().close();
    }
}

/// Structural queries on an object field.
pub(crate) trait ObjectNode {
    fn field(&self) -> &dyn FieldNode;

    fn inner_node(&self) -> Rc<DocNode>;

    /// The embedded document must be written whole at the field's path.
    fn rewrites(&self) -> bool;
}

/// Structural queries on a map field.
pub(crate) trait MapNode {
    fn field(&self) -> &dyn FieldNode;

    /// The whole map must be written at the field's path.
    fn rewrites(&self) -> bool;

    /// Changed entries with their dotted paths, in the order they changed.
    fn changed_entries(&self) -> Vec<(String, Rc<DocNode>)>;
}

/// A container owning an embedded document: receives its dirty signal and
/// resolves its path.
pub(crate) trait DocParent {
    fn child_dirty(&self, child: &DocNode);

    fn child_path(&self, child: &DocNode) -> String;

    fn record_unset(&self, path: String);
}

/// A document's owned field, one variant per kind.
#[derive(Clone)]
pub(crate) enum FieldSlot {
    Scalar(Rc<dyn FieldNode>),
    Array(Rc<dyn FieldNode>),
    Object(Rc<dyn ObjectNode>),
    Map(Rc<dyn MapNode>),
    TimeRestoring(Rc<dyn FieldNode>),
}

impl FieldSlot {
    pub(crate) fn node(&self) -> &dyn FieldNode {
        match self {
            FieldSlot::Scalar(node) | FieldSlot::Array(node) | FieldSlot::TimeRestoring(node) => {
                node.as_ref()
            }
            FieldSlot::Object(object) => object.field(),
            FieldSlot::Map(map) => map.field(),
        }
    }
}

/// Information handed to change hooks.
pub struct FieldChange<'a, T> {
    pub name: &'a str,
    pub kind: FieldKind,
    pub current: &'a T,
    /// Only set for numeric kinds.
    pub previous: Option<&'a T>,
    pub param: Option<&'a dyn Any>,
}

type Hook<T> = Rc<dyn Fn(&FieldChange<'_, T>)>;

/// Change hooks registered on a field.
pub(crate) struct Hooks<T> {
    list: RefCell<Vec<Hook<T>>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            list: RefCell::new(Vec::new()),
        }
    }
}

impl<T> Hooks<T> {
    pub(crate) fn add(&self, hook: impl Fn(&FieldChange<'_, T>) + 'static) {
        self.list.borrow_mut().push(Rc::new(hook));
    }

    pub(crate) fn fire(&self, base: &FieldBase, current: &T, previous: &T, param: Option<&dyn Any>) {
        // Hooks may register further hooks or mutate other fields.
        let hooks = self.list.borrow().clone();
        if hooks.is_empty() {
            return;
        }
        let change = FieldChange {
            name: base.name(),
            kind: base.kind(),
            current,
            previous: base.kind().is_numeric().then_some(previous),
            param,
        };
        for hook in hooks {
            hook(&change);
        }
    }

    pub(crate) fn clear(&self) {
        self.list.borrow_mut().clear();
    }
}

/// Common read access to any field handle.
pub trait Field {
    fn name(&self) -> &str;

    fn kind(&self) -> FieldKind;

    fn is_dirty(&self) -> bool;

    /// Dotted path from the root document
    fn full_path(&self) -> String;

    /// The field's complete persisted value
    fn to_value(&self) -> Result<Value, FieldError>;
}

/// Implements [`Field`] for a handle whose cell implements [`FieldNode`].
macro_rules! impl_field_handle {
    ($handle:ident < $($param:ident : $bound:path),* >) => {
        impl<$($param: $bound),*> $crate::doc::Field for $handle<$($param),*> {
            fn name(&self) -> &str {
                $crate::doc::field::FieldNode::base(self.cell.as_ref()).name()
            }

            fn kind(&self) -> $crate::doc::FieldKind {
                $crate::doc::field::FieldNode::base(self.cell.as_ref()).kind()
            }

            fn is_dirty(&self) -> bool {
                $crate::doc::field::FieldNode::base(self.cell.as_ref()).is_dirty()
            }

            fn full_path(&self) -> String {
                $crate::doc::field::FieldNode::base(self.cell.as_ref()).full_path()
            }

            fn to_value(&self) -> Result<$crate::value::Value, $crate::doc::FieldError> {
                $crate::doc::field::FieldNode::full_value(self.cell.as_ref())
            }
        }
    };
}

pub(crate) use impl_field_handle;

/// Builds the full document of a node's fields, in declaration order.
pub(crate) fn full_document(node: &DocNode) -> Result<Document, FieldError> {
    let mut document = Document::new();
    for (name, slot) in node.named_slots() {
        document.insert(name, slot.node().full_value()?);
    }
    Ok(document)
}
