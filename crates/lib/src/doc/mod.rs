//! Typed change-tracking documents.
//!
//! A document is declared once as a [`Schema`]: a struct of field handles
//! built by [`Schema::describe`] through a [`Registrar`]. [`Doc`] owns the
//! resulting field tree and derefs to the schema, so fields are reached by
//! name:
//!
//! ```
//! use docfields::{
//!     doc::{Doc, FieldError, FlushMode, Object, Registrar, Scalar, Schema},
//!     value::Value,
//! };
//!
//! struct Stats { level: Scalar<i32> }
//!
//! impl Schema for Stats {
//!     fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
//!         Ok(Self { level: fields.scalar("level")? })
//!     }
//! }
//!
//! struct Player { hp: Scalar<i32>, stats: Object<Stats> }
//!
//! impl Schema for Player {
//!     fn describe(fields: &mut Registrar<'_>) -> Result<Self, FieldError> {
//!         Ok(Self {
//!             hp: fields.scalar("hp")?,
//!             stats: fields.object("stats")?,
//!         })
//!     }
//! }
//!
//! let player = Doc::<Player>::new()?;
//! player.hp.set(50)?;
//! player.stats.get().level.set(3)?;
//! player.serialize(FlushMode::Full)?;
//!
//! player.stats.get().level.set(4)?;
//! let changes = player.serialize(FlushMode::Incremental)?;
//! assert_eq!(changes.set, vec![("stats.level".to_string(), Value::Int32(4))]);
//! assert!(changes.unset.is_empty());
//! # Ok::<(), docfields::Error>(())
//! ```
//!
//! Every mutation marks its field dirty and bubbles the signal to the root.
//! [`Doc::serialize`] turns the dirty state into a [`ChangeSet`] and clears
//! it; [`Doc::deserialize`] loads a raw stream and leaves the tree clean.

use std::{fmt, ops::Deref, rc::Rc, sync::Arc};

use tracing::debug;

use crate::{
    Clock, Result, SystemClock,
    raw::RawReader,
    value::{Document, Value},
};

mod array;
mod decode;
mod errors;
pub(crate) mod field;
mod flush;
mod map;
mod node;
mod object;
pub mod path;
mod primitive;
mod registrar;
mod restoring;
mod scalar;
mod ticks;

pub use array::Array;
pub use decode::DecodeReport;
pub use errors::FieldError;
pub use field::{Field, FieldChange, FieldKind};
pub use flush::{ChangeSet, FlushMode};
pub use map::Map;
pub use object::Object;
pub use primitive::{ConvertError, IntegerKey, MapKey, Primitive, enum_from_value};
pub use registrar::Registrar;
pub use restoring::{RestoreConfig, TimeRestoring};
pub use scalar::Scalar;
pub use ticks::{TickEvent, TickQueue, TickSender};

use node::DocNode;

/// A document layout: a struct of field handles.
pub trait Schema: Sized + 'static {
    /// Registers every field. Called exactly once per document.
    fn describe(fields: &mut Registrar<'_>) -> std::result::Result<Self, FieldError>;
}

/// What documents share with the world outside the tree: the clock and,
/// optionally, the owner's tick queue.
#[derive(Clone)]
pub struct DocContext {
    clock: Arc<dyn Clock>,
    ticks: Option<TickSender>,
}

impl Default for DocContext {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl DocContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, ticks: None }
    }

    /// Routes regeneration ticks through `ticks`.
    pub fn with_ticks(mut self, ticks: TickSender) -> Self {
        self.ticks = Some(ticks);
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ticks(&self) -> Option<&TickSender> {
        self.ticks.as_ref()
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}

impl fmt::Debug for DocContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocContext")
            .field("clock", &self.clock)
            .field("ticks", &self.ticks.is_some())
            .finish()
    }
}

/// A typed document: the field tree plus the schema's handles into it.
///
/// Cloning yields another handle to the same document.
pub struct Doc<S: Schema> {
    node: Rc<DocNode>,
    schema: Rc<S>,
}

impl<S: Schema> Clone for Doc<S> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<S: Schema> Deref for Doc<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.schema
    }
}

impl<S: Schema> fmt::Debug for Doc<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Doc")
            .field("path", &self.node.full_path())
            .field("fields", &self.node.len())
            .field("dirty", &self.node.is_dirty())
            .field("closed", &self.node.is_closed())
            .finish()
    }
}

impl<S: Schema> Doc<S> {
    /// Creates a document with the system clock and no tick queue.
    pub fn new() -> Result<Self> {
        Self::with_context(&DocContext::default())
    }

    pub fn with_context(context: &DocContext) -> Result<Self> {
        Ok(Self::build(context)?)
    }

    pub(crate) fn build(context: &DocContext) -> std::result::Result<Self, FieldError> {
        let node = DocNode::new(context.clone());
        let schema = S::describe(&mut Registrar::new(&node))?;
        debug!(
            schema = std::any::type_name::<S>(),
            fields = node.len(),
            "registered document"
        );
        Ok(Self {
            node,
            schema: Rc::new(schema),
        })
    }

    pub(crate) fn node(&self) -> &Rc<DocNode> {
        &self.node
    }

    pub fn context(&self) -> &DocContext {
        self.node.context()
    }

    /// Computes the change-set and clears dirty state.
    ///
    /// On error nothing is cleared.
    pub fn serialize(&self, mode: FlushMode) -> Result<ChangeSet> {
        let changes = self.pending_changes(mode)?;
        self.mark_clean();
        Ok(changes)
    }

    /// Computes the change-set without clearing anything.
    pub fn pending_changes(&self, mode: FlushMode) -> Result<ChangeSet> {
        self.node.ensure_open()?;
        Ok(flush::collect(&self.node, mode)?)
    }

    /// Clears every dirty flag and drains the unset list, e.g. after the
    /// change-set from [`pending_changes`](Self::pending_changes) was stored.
    pub fn mark_clean(&self) {
        flush::mark_clean(&self.node);
    }

    /// Reads and clears the unset list.
    pub fn take_unset_paths(&self) -> Vec<String> {
        self.node.take_unset()
    }

    /// Populates fields from a raw stream. The tree is clean afterwards.
    pub fn deserialize<'a>(&self, reader: &mut (dyn RawReader<'a> + 'a)) -> Result<DecodeReport> {
        self.node.ensure_open()?;
        let mut report = DecodeReport::default();
        decode::decode_fields(&self.node, reader, &mut report)?;
        self.node.clear_dirty();
        debug!(
            errors = report.errors.len(),
            skipped = report.skipped.len(),
            "decoded document"
        );
        Ok(report)
    }

    /// The full value tree of this document.
    pub fn to_document(&self) -> Result<Document> {
        self.node.ensure_open()?;
        Ok(field::full_document(&self.node)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        self.to_document().map(Value::Document)
    }

    /// Dotted path from the root; `""` for the root itself.
    pub fn full_path(&self) -> String {
        self.node.full_path()
    }

    pub fn is_dirty(&self) -> bool {
        self.node.is_dirty()
    }

    pub fn is_closed(&self) -> bool {
        self.node.is_closed()
    }

    /// Releases every field. Further mutation fails with
    /// [`FieldError::UseAfterClose`].
    pub fn close(&self) {
        self.node.close();
    }

    /// Returns true if both handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}
