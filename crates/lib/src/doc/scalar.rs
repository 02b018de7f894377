use std::{any::Any, cell::RefCell, rc::Rc};

use super::{
    decode::{DecodeFailure, DecodeReport},
    errors::FieldError,
    field::{FieldBase, FieldChange, FieldKind, FieldNode, Hooks, impl_field_handle},
    node::DocNode,
    primitive::{Primitive, load_as, store_as},
};
use crate::{raw::RawPayload, value::Value};

pub(crate) struct ScalarCell<T: Primitive> {
    base: FieldBase,
    value: RefCell<T>,
    hooks: Hooks<T>,
}

impl<T: Primitive> ScalarCell<T> {
    pub(crate) fn new(name: &str, kind: FieldKind, owner: &Rc<DocNode>) -> Self {
        Self {
            base: FieldBase::new(name, kind, owner),
            value: RefCell::new(T::default()),
            hooks: Hooks::default(),
        }
    }
}

impl<T: Primitive> FieldNode for ScalarCell<T> {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn full_value(&self) -> Result<Value, FieldError> {
        let value = self
            .value
            .borrow()
            .to_value()
            .map_err(|e| self.base.type_mismatch(e))?;
        store_as(self.base.kind(), value).map_err(|e| self.base.type_mismatch(e))
    }

    fn decode(&self, payload: RawPayload<'_>, _report: &mut DecodeReport) -> Result<(), DecodeFailure> {
        let found = payload.element_type();
        let value = payload.into_value()?;
        let decoded = load_as::<T>(&value).map_err(|_| self.base.conversion_error(found.name()))?;
        *self.value.borrow_mut() = decoded;
        Ok(())
    }

    fn reset(&self) {
        *self.value.borrow_mut() = T::default();
    }

    fn close(&self) {
        self.base.close();
        self.hooks.clear();
    }
}

/// Handle to a field holding one primitive value.
///
/// ```
/// # use docfields::doc::{Doc, FieldError, Registrar, Scalar, Schema};
/// struct Hero { hp: Scalar<i32> }
///
/// impl Schema for Hero {
///     fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
///         Ok(Self { hp: fields.scalar("hp")? })
///     }
/// }
///
/// let hero = Doc::<Hero>::new()?;
/// hero.hp.set(50)?;
/// assert_eq!(hero.hp.get(), 50);
/// # Ok::<(), docfields::Error>(())
/// ```
pub struct Scalar<T: Primitive> {
    cell: Rc<ScalarCell<T>>,
}

impl<T: Primitive> Clone for Scalar<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Primitive> Scalar<T> {
    pub(crate) fn new(cell: Rc<ScalarCell<T>>) -> Self {
        Self { cell }
    }

    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }

    /// Reads the value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.borrow())
    }

    pub fn set(&self, value: T) -> Result<(), FieldError> {
        self.apply(value, None)
    }

    /// Sets the value and hands `param` to the change hooks.
    pub fn set_with(&self, value: T, param: &dyn Any) -> Result<(), FieldError> {
        self.apply(value, Some(param))
    }

    /// Updates the value in place from its current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<(), FieldError> {
        let next = f(&self.cell.value.borrow());
        self.set(next)
    }

    fn apply(&self, value: T, param: Option<&dyn Any>) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let current = value.clone();
        let previous = cell.value.replace(value);
        cell.base.mark_dirty();
        cell.hooks.fire(&cell.base, &current, &previous, param);
        Ok(())
    }

    /// Registers a callback invoked after every change.
    pub fn on_change(&self, hook: impl Fn(&FieldChange<'_, T>) + 'static) {
        self.cell.hooks.add(hook);
    }

    /// Resets to the default and schedules the field's path for removal.
    pub fn unset(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.reset();
        cell.base.clear_dirty();
        cell.base.record_unset();
        Ok(())
    }
}

impl_field_handle!(Scalar<T: Primitive>);
