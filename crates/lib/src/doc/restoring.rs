//! A bounded integer that regenerates by one per interval.
//!
//! The field is either idle at its maximum or regenerating below it. While
//! regenerating a timer is armed for the next tick boundary; each live tick
//! adds exactly one. When a document is loaded after a period without live
//! ticks, the elapsed whole intervals are applied at once:
//!
//! - overshooting the maximum: the value caps and the last update becomes now
//! - otherwise: the last update advances by the consumed intervals,
//!   so a partially elapsed interval is not lost
//!
//! Persisted form: `{val, maxval, utime, tick}`. Only `val` and `utime` are
//! read back; the maximum and interval come from registration.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::trace;

use super::{
    DocContext, Field,
    decode::{DecodeFailure, DecodeReport},
    errors::FieldError,
    field::{FieldBase, FieldChange, FieldKind, FieldNode, Hooks},
    node::DocNode,
};
use crate::{
    constants::{RESTORE_INTERVAL, RESTORE_MAX, RESTORE_UPDATED, RESTORE_VALUE},
    document,
    raw::{RawPayload, read_document},
    value::Value,
};

/// Registration parameters of a time-restoring field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreConfig {
    /// Value of a fresh field
    pub initial: i64,
    pub max: i64,
    /// Time per +1; zero disables regeneration
    pub interval: Duration,
}

impl RestoreConfig {
    /// A field starting full.
    pub fn new(max: i64, interval: Duration) -> Self {
        Self {
            initial: max,
            max,
            interval,
        }
    }

    pub fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct RestoreState {
    value: i64,
    max: i64,
    last_update: i64,
}

enum Timer {
    Idle,
    Armed {
        generation: u64,
        task: Option<JoinHandle<()>>,
    },
}

pub(crate) struct RestoreCell {
    base: FieldBase,
    config: RestoreConfig,
    interval_ms: i64,
    context: DocContext,
    state: RefCell<RestoreState>,
    timer: RefCell<Timer>,
    generation: Cell<u64>,
    target: Option<u64>,
    hooks: Hooks<i64>,
}

impl RestoreCell {
    pub(crate) fn new(name: &str, config: RestoreConfig, owner: &Rc<DocNode>) -> Rc<Self> {
        let context = owner.context().clone();
        let now = context.now_millis();
        let cell = Rc::new_cyclic(|me: &Weak<RestoreCell>| {
            let target = context.ticks().map(|ticks| ticks.register(me.clone()));
            Self {
                base: FieldBase::new(name, FieldKind::TimeRestoring, owner),
                config,
                interval_ms: i64::try_from(config.interval.as_millis()).unwrap_or(i64::MAX),
                context,
                state: RefCell::new(RestoreState {
                    value: config.initial,
                    max: config.max,
                    last_update: now,
                }),
                timer: RefCell::new(Timer::Idle),
                generation: Cell::new(0),
                target,
                hooks: Hooks::default(),
            }
        });
        cell.arm();
        cell
    }

    fn now(&self) -> i64 {
        self.context.now_millis()
    }

    fn state(&self) -> RestoreState {
        *self.state.borrow()
    }

    fn is_armed(&self) -> bool {
        matches!(*self.timer.borrow(), Timer::Armed { .. })
    }

    /// Arms the timer while below the maximum, disarms otherwise.
    fn arm(&self) {
        let state = self.state();
        if self.interval_ms <= 0 || state.value >= state.max {
            self.disarm();
            return;
        }
        if self.is_armed() {
            return;
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let elapsed = self.now().saturating_sub(state.last_update).max(0);
        let delay = self.interval_ms - elapsed % self.interval_ms;
        let task = match (self.target, self.context.ticks()) {
            (Some(target), Some(ticks)) => {
                ticks.schedule(target, generation, Duration::from_millis(delay as u64))
            }
            _ => None,
        };
        trace!(
            field = self.base.name(),
            delay_ms = delay,
            generation,
            scheduled = task.is_some(),
            "armed regeneration timer"
        );
        *self.timer.borrow_mut() = Timer::Armed { generation, task };
    }

    fn disarm(&self) {
        let previous = self.timer.replace(Timer::Idle);
        if let Timer::Armed { task, .. } = previous {
            self.generation.set(self.generation.get() + 1);
            if let Some(task) = task {
                task.abort();
            }
            trace!(field = self.base.name(), "disarmed regeneration timer");
        }
    }

    /// Applies one live tick if `generation` is the armed one.
    pub(crate) fn apply_tick(&self, generation: u64) -> bool {
        let current = matches!(
            &*self.timer.borrow(),
            Timer::Armed { generation: armed, .. } if *armed == generation
        );
        if self.base.is_closed() || !current {
            trace!(field = self.base.name(), generation, "ignoring stale tick");
            return false;
        }
        *self.timer.borrow_mut() = Timer::Idle;

        let now = self.now();
        let (previous, value) = {
            let mut state = self.state.borrow_mut();
            let previous = state.value;
            if state.value < state.max {
                state.value += 1;
            }
            state.last_update = now;
            (previous, state.value)
        };
        self.base.mark_dirty();
        self.hooks.fire(&self.base, &value, &previous, None);
        self.arm();
        true
    }

    /// Applies the whole intervals elapsed since the last update.
    ///
    /// Returns the previous value if anything changed.
    fn fast_forward(&self, now: i64) -> Option<i64> {
        if self.interval_ms <= 0 {
            return None;
        }
        let mut state = self.state.borrow_mut();
        let elapsed = now.saturating_sub(state.last_update);
        if elapsed < self.interval_ms {
            return None;
        }
        let ticks = elapsed / self.interval_ms;
        let previous = state.value;
        if state.value < state.max {
            let next = state.value.saturating_add(ticks);
            if next > state.max {
                state.value = state.max;
                state.last_update = now;
            } else {
                state.value = next;
                state.last_update = state
                    .last_update
                    .saturating_add(ticks.saturating_mul(self.interval_ms));
            }
        } else {
            state.last_update = now;
        }
        Some(previous)
    }

    fn set_state(&self, state: RestoreState) {
        *self.state.borrow_mut() = state;
        self.disarm();
        self.arm();
    }
}

impl FieldNode for RestoreCell {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn full_value(&self) -> Result<Value, FieldError> {
        let state = self.state();
        Ok(Value::Document(document! {
            RESTORE_VALUE => state.value,
            RESTORE_MAX => state.max,
            RESTORE_UPDATED => Value::DateTime(state.last_update),
            RESTORE_INTERVAL => self.interval_ms,
        }))
    }

    fn decode(&self, payload: RawPayload<'_>, _report: &mut DecodeReport) -> Result<(), DecodeFailure> {
        let now = self.now();
        let found = payload.element_type();
        let mut state = self.state();
        match payload {
            RawPayload::Document(mut reader) => {
                let stored = read_document(reader.as_mut())?;
                state.value = stored
                    .get(RESTORE_VALUE)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| self.base.conversion_error("document without an integer val"))?;
                state.last_update = match stored.get(RESTORE_UPDATED) {
                    Some(Value::DateTime(ms)) => *ms,
                    Some(other) => other.as_i64().unwrap_or(now),
                    None => now,
                };
            }
            RawPayload::Int32(n) => {
                state.value = i64::from(n);
                state.last_update = now;
            }
            RawPayload::Int64(n) => {
                state.value = n;
                state.last_update = now;
            }
            _ => return Err(self.base.conversion_error(found.name()).into()),
        }

        *self.state.borrow_mut() = state;
        if let Some(previous) = self.fast_forward(now) {
            trace!(
                field = self.base.name(),
                previous,
                value = self.state().value,
                "caught up on load"
            );
        }
        self.disarm();
        self.arm();
        Ok(())
    }

    fn reset(&self) {
        self.set_state(RestoreState {
            value: self.config.initial,
            max: self.config.max,
            last_update: self.now(),
        });
    }

    fn close(&self) {
        self.base.close();
        self.disarm();
        self.hooks.clear();
        if let (Some(target), Some(ticks)) = (self.target, self.context.ticks()) {
            ticks.unregister(target);
        }
    }
}

/// Handle to a regenerating bounded integer.
#[derive(Clone)]
pub struct TimeRestoring {
    cell: Rc<RestoreCell>,
}

impl TimeRestoring {
    pub(crate) fn new(cell: Rc<RestoreCell>) -> Self {
        Self { cell }
    }

    pub fn get(&self) -> i64 {
        self.cell.state().value
    }

    pub fn max_value(&self) -> i64 {
        self.cell.state().max
    }

    pub fn interval(&self) -> Duration {
        self.cell.config.interval
    }

    /// Time of the last recorded change, in milliseconds since the epoch.
    pub fn last_update_millis(&self) -> i64 {
        self.cell.state().last_update
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_update_millis()).unwrap_or_default()
    }

    /// True while below the maximum with a timer armed.
    pub fn is_regenerating(&self) -> bool {
        self.cell.is_armed()
    }

    /// Milliseconds until the next tick; zero at the maximum.
    pub fn remaining_millis(&self) -> i64 {
        let cell = &self.cell;
        let state = cell.state();
        if cell.interval_ms <= 0 || state.value >= state.max {
            return 0;
        }
        let elapsed = cell.now().saturating_sub(state.last_update).max(0);
        cell.interval_ms - elapsed % cell.interval_ms
    }

    pub fn set(&self, value: i64) -> Result<(), FieldError> {
        self.apply(value, None)
    }

    /// Sets the value and hands `param` to the change hooks.
    pub fn set_with(&self, value: i64, param: &dyn Any) -> Result<(), FieldError> {
        self.apply(value, Some(param))
    }

    fn apply(&self, value: i64, param: Option<&dyn Any>) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let now = cell.now();
        let previous = {
            let mut state = cell.state.borrow_mut();
            let previous = state.value;
            if previous >= state.max && value < state.max {
                state.last_update = now;
            }
            state.value = value;
            previous
        };
        cell.base.mark_dirty();
        cell.hooks.fire(&cell.base, &value, &previous, param);
        cell.arm();
        Ok(())
    }

    /// Changes the maximum, arming the timer if the value is now below it.
    pub fn set_max(&self, max: i64) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let now = cell.now();
        {
            let mut state = cell.state.borrow_mut();
            if state.value >= state.max && state.value < max {
                state.last_update = now;
            }
            state.max = max;
        }
        cell.base.mark_dirty();
        cell.arm();
        Ok(())
    }

    /// Applies the intervals elapsed since the last update, as a load would.
    ///
    /// Needed when the document has no tick queue. Returns true if the
    /// value or its timestamp moved.
    pub fn catch_up(&self) -> Result<bool, FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        let Some(previous) = cell.fast_forward(cell.now()) else {
            return Ok(false);
        };
        let value = cell.state().value;
        cell.base.mark_dirty();
        if value != previous {
            cell.hooks.fire(&cell.base, &value, &previous, None);
        }
        // The armed delay was computed from the old timestamp.
        cell.disarm();
        cell.arm();
        Ok(true)
    }

    /// Registers a callback invoked after every value change, including ticks.
    pub fn on_change(&self, hook: impl Fn(&FieldChange<'_, i64>) + 'static) {
        self.cell.hooks.add(hook);
    }

    /// Resets to the registered configuration and schedules the field's
    /// path for removal.
    pub fn unset(&self) -> Result<(), FieldError> {
        let cell = &self.cell;
        cell.base.ensure_open()?;
        cell.reset();
        cell.base.clear_dirty();
        cell.base.record_unset();
        Ok(())
    }
}

impl Field for TimeRestoring {
    fn name(&self) -> &str {
        self.cell.base.name()
    }

    fn kind(&self) -> FieldKind {
        self.cell.base.kind()
    }

    fn is_dirty(&self) -> bool {
        self.cell.base.is_dirty()
    }

    fn full_path(&self) -> String {
        self.cell.base.full_path()
    }

    fn to_value(&self) -> Result<Value, FieldError> {
        self.cell.full_value()
    }
}
