use std::rc::Rc;

use super::{
    Schema,
    array::{Array, ArrayCell},
    errors::FieldError,
    field::{FieldKind, FieldSlot},
    map::{Map, MapCell},
    node::DocNode,
    object::{Object, ObjectCell},
    primitive::{MapKey, Primitive, store_as},
    restoring::{RestoreCell, RestoreConfig, TimeRestoring},
    scalar::{Scalar, ScalarCell},
};

/// Declares a document's fields. Only handed out to [`Schema::describe`],
/// so fields cannot be added once a document exists.
pub struct Registrar<'r> {
    node: &'r Rc<DocNode>,
}

impl<'r> Registrar<'r> {
    pub(crate) fn new(node: &'r Rc<DocNode>) -> Self {
        Self { node }
    }

    fn check_name(&self, name: &str) -> Result<(), FieldError> {
        if self.node.contains(name) {
            Err(FieldError::DuplicateField {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Registers a scalar whose kind follows from `T`.
    pub fn scalar<T: Primitive>(&mut self, name: &str) -> Result<Scalar<T>, FieldError> {
        self.scalar_as(T::KIND, name)
    }

    /// Registers a scalar stored as `kind`.
    ///
    /// Structural kinds, and kinds `T` cannot be stored as, are rejected
    /// with [`FieldError::InvalidKind`].
    pub fn scalar_as<T: Primitive>(&mut self, kind: FieldKind, name: &str) -> Result<Scalar<T>, FieldError> {
        let invalid = || FieldError::InvalidKind {
            name: name.to_string(),
            kind,
        };
        if kind.is_structural() {
            return Err(invalid());
        }
        let sample = T::default().to_value().map_err(|_| invalid())?;
        store_as(kind, sample).map_err(|_| invalid())?;
        self.check_name(name)?;

        let cell = Rc::new(ScalarCell::<T>::new(name, kind, self.node));
        self.node.register(name, FieldSlot::Scalar(cell.clone()))?;
        Ok(Scalar::new(cell))
    }

    pub fn array<T: Primitive>(&mut self, name: &str) -> Result<Array<T>, FieldError> {
        self.check_name(name)?;
        let cell = Rc::new(ArrayCell::<T>::new(name, self.node));
        self.node.register(name, FieldSlot::Array(cell.clone()))?;
        Ok(Array::new(cell))
    }

    pub fn object<D: Schema>(&mut self, name: &str) -> Result<Object<D>, FieldError> {
        self.check_name(name)?;
        let cell = ObjectCell::<D>::new(name, self.node)?;
        self.node.register(name, FieldSlot::Object(cell.clone()))?;
        Ok(Object::new(cell))
    }

    pub fn map<K: MapKey, D: Schema>(&mut self, name: &str) -> Result<Map<K, D>, FieldError> {
        self.check_name(name)?;
        let cell = MapCell::<K, D>::new(name, self.node);
        self.node.register(name, FieldSlot::Map(cell.clone()))?;
        Ok(Map::new(cell))
    }

    pub fn time_restoring(&mut self, name: &str, config: RestoreConfig) -> Result<TimeRestoring, FieldError> {
        self.check_name(name)?;
        let cell = RestoreCell::new(name, config, self.node);
        self.node.register(name, FieldSlot::TimeRestoring(cell.clone()))?;
        Ok(TimeRestoring::new(cell))
    }
}
