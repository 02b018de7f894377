//! Routing regeneration timer ticks through the owner.
//!
//! Timer tasks never touch a document. Each armed time-restoring field
//! spawns one tokio task that sleeps until the next tick boundary and sends a
//! [`TickEvent`] over an unbounded channel. The owner drains the channel
//! through its [`TickQueue`], which applies the tick on the owner's side,
//! so ticks and ordinary mutation never race.
//!
//! Disarming a timer bumps its generation and aborts the task. An event that
//! was already in flight carries the old generation and is ignored, as is an
//! event whose field has been closed or dropped.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
    time::Duration,
};

use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::trace;

use super::restoring::RestoreCell;

/// A tick for one armed timer generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    target: u64,
    generation: u64,
}

#[derive(Default)]
struct TickTargets {
    next_id: u64,
    cells: HashMap<u64, Weak<RestoreCell>>,
}

impl TickTargets {
    /// Drops fields whose document went away without being closed.
    fn prune(&mut self) {
        self.cells.retain(|_, cell| cell.strong_count() > 0);
    }
}

/// The scheduling side handed to documents through their context.
#[derive(Clone)]
pub struct TickSender {
    tx: UnboundedSender<TickEvent>,
    targets: Rc<RefCell<TickTargets>>,
}

impl TickSender {
    pub(crate) fn register(&self, cell: Weak<RestoreCell>) -> u64 {
        let mut targets = self.targets.borrow_mut();
        targets.prune();
        targets.next_id += 1;
        let id = targets.next_id;
        targets.cells.insert(id, cell);
        id
    }

    pub(crate) fn unregister(&self, target: u64) {
        self.targets.borrow_mut().cells.remove(&target);
    }

    /// Spawns a task delivering one tick after `delay`.
    ///
    /// Returns `None` outside a tokio runtime; the field then regenerates
    /// only through catch-up.
    pub(crate) fn schedule(&self, target: u64, generation: u64, delay: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            trace!(field_id = target, "no runtime, tick not scheduled");
            return None;
        };
        let tx = self.tx.clone();
        Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // The queue may already be gone; the tick is moot then.
            let _ = tx.send(TickEvent { target, generation });
        }))
    }
}

impl std::fmt::Debug for TickSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickSender")
            .field("targets", &self.targets.borrow().cells.len())
            .finish()
    }
}

/// The owner's end of the tick channel.
pub struct TickQueue {
    rx: UnboundedReceiver<TickEvent>,
    sender: TickSender,
}

impl Default for TickQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TickQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            rx,
            sender: TickSender {
                tx,
                targets: Rc::new(RefCell::new(TickTargets::default())),
            },
        }
    }

    /// A sender for a [`DocContext`](super::DocContext).
    pub fn sender(&self) -> TickSender {
        self.sender.clone()
    }

    /// Number of live time-restoring fields registered with this queue.
    pub fn targets(&self) -> usize {
        let mut targets = self.sender.targets.borrow_mut();
        targets.prune();
        targets.cells.len()
    }

    /// Applies every tick already delivered, returning how many changed a field.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next tick and applies it. Returns false if it was stale.
    pub async fn apply_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    fn apply(&self, event: TickEvent) -> bool {
        let cell = self
            .sender
            .targets
            .borrow()
            .cells
            .get(&event.target)
            .and_then(Weak::upgrade);
        match cell {
            Some(cell) => cell.apply_tick(event.generation),
            None => {
                trace!(field_id = event.target, "tick for a dropped field");
                self.sender.targets.borrow_mut().prune();
                false
            }
        }
    }
}
