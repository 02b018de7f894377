use std::{cell::RefCell, rc::Rc};

use super::{
    decode::{DecodeFailure, DecodeReport},
    errors::FieldError,
    field::{FieldBase, FieldKind, FieldNode, impl_field_handle},
    node::DocNode,
    primitive::{Primitive, load_as},
};
use crate::{raw::RawPayload, value::Value};

pub(crate) struct ArrayCell<T: Primitive> {
    base: FieldBase,
    values: RefCell<Vec<T>>,
}

impl<T: Primitive> ArrayCell<T> {
    pub(crate) fn new(name: &str, owner: &Rc<DocNode>) -> Self {
        Self {
            base: FieldBase::new(name, FieldKind::Array, owner),
            values: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Primitive> FieldNode for ArrayCell<T> {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn full_value(&self) -> Result<Value, FieldError> {
        self.values
            .borrow()
            .iter()
            .map(|v| v.to_value().map_err(|e| self.base.type_mismatch(e)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn decode(&self, payload: RawPayload<'_>, _report: &mut DecodeReport) -> Result<(), DecodeFailure> {
        let found = payload.element_type();
        let RawPayload::Array(mut elements) = payload else {
            return Err(self.base.conversion_error(found.name()).into());
        };
        // Built aside so a bad element leaves the previous content untouched.
        let mut decoded = Vec::new();
        while let Some(element) = elements.next_element()? {
            let found = element.payload.element_type();
            let value = element.payload.into_value()?;
            let item = load_as::<T>(&value).map_err(|_| {
                FieldError::ConversionError {
                    field: format!("{}.{}", self.base.full_path(), element.name),
                    expected: T::KIND.to_string(),
                    found: found.to_string(),
                }
            })?;
            decoded.push(item);
        }
        *self.values.borrow_mut() = decoded;
        Ok(())
    }

    fn reset(&self) {
        self.values.borrow_mut().clear();
    }
}

/// Handle to an ordered sequence of primitives.
///
/// Any mutation marks the whole array dirty; a flush rewrites it whole.
pub struct Array<T: Primitive> {
    cell: Rc<ArrayCell<T>>,
}

impl<T: Primitive> Clone for Array<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Primitive> Array<T> {
    pub(crate) fn new(cell: Rc<ArrayCell<T>>) -> Self {
        Self { cell }
    }

    pub fn len(&self) -> usize {
        self.cell.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.values.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.cell.values.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.cell.values.borrow().clone()
    }

    /// Elements matching `predicate`, in order.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.cell
            .values
            .borrow()
            .iter()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    pub fn push(&self, value: T) -> Result<(), FieldError> {
        self.mutate(|values| {
            values.push(value);
            Ok(())
        })
    }

    pub fn set(&self, index: usize, value: T) -> Result<(), FieldError> {
        self.mutate(|values| {
            let len = values.len();
            let slot = values.get_mut(index).ok_or_else(|| FieldError::OutOfBounds {
                field: self.cell.base.full_path(),
                index,
                len,
            })?;
            *slot = value;
            Ok(())
        })
    }

    pub fn remove(&self, index: usize) -> Result<T, FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let removed = {
            let mut values = cell.values.borrow_mut();
            if index >= values.len() {
                return Err(FieldError::OutOfBounds {
                    field: cell.base.full_path(),
                    index,
                    len: values.len(),
                });
            }
            values.remove(index)
        };
        cell.base.mark_dirty();
        Ok(removed)
    }

    /// Replaces the whole content.
    pub fn set_all(&self, values: Vec<T>) -> Result<(), FieldError> {
        self.mutate(|current| {
            *current = values;
            Ok(())
        })
    }

    pub fn clear(&self) -> Result<(), FieldError> {
        self.mutate(|values| {
            values.clear();
            Ok(())
        })
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<T>) -> Result<(), FieldError>) -> Result<(), FieldError> {
        self.cell.base.ensure_open()?;
        f(&mut self.cell.values.borrow_mut())?;
        self.cell.base.mark_dirty();
        Ok(())
    }

    /// Empties the array and schedules its path for removal.
    pub fn unset(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.reset();
        cell.base.clear_dirty();
        cell.base.record_unset();
        Ok(())
    }
}

impl_field_handle!(Array<T: Primitive>);
