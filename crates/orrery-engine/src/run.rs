//! The registry of live runs: at most one per world.
//!
//! A [`RunSlot`] exists for a world from the moment a start claims it
//! until its run loop exits. Claiming is a single check-and-insert under
//! the registry mutex, so two concurrent starts can never both succeed.
//! The winning start holds a [`RunClaim`]; dropping it, on any exit path
//! including unwinding, removes the slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use orrery_core::{WorldAction, WorldId};

use crate::error::ControlError;

struct RunSlot {
    running: AtomicBool,
    initialized: AtomicBool,
    actions: Sender<WorldAction>,
}

/// Live-run bookkeeping shared by the run controller and request side.
///
/// Only atomic operations are exposed; callers never see the map.
#[derive(Default)]
pub struct RunRegistry {
    slots: Mutex<HashMap<WorldId, Arc<RunSlot>>>,
}

impl RunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `world` for a new run.
    ///
    /// Returns `None` if a slot already exists, including one whose loop
    /// has been asked to stop but has not exited yet.
    pub fn claim(self: &Arc<Self>, world: WorldId) -> Option<RunClaim> {
        let mut slots = self.slots.lock().unwrap();
        if slots.contains_key(&world) {
            return None;
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        let slot = Arc::new(RunSlot {
            running: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            actions: tx,
        });
        slots.insert(world, Arc::clone(&slot));
        Some(RunClaim {
            registry: Arc::clone(self),
            world,
            slot,
            actions: rx,
        })
    }

    /// Ask the world's loop to exit after its current tick.
    ///
    /// Returns whether the world was running.
    pub fn stop(&self, world: WorldId) -> bool {
        match self.slots.lock().unwrap().get(&world) {
            Some(slot) => slot.running.swap(false, Ordering::AcqRel),
            None => false,
        }
    }

    /// Ask every loop to exit. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .values()
            .filter(|slot| slot.running.swap(false, Ordering::AcqRel))
            .count()
    }

    /// Whether the world has a slot whose running flag is still set.
    pub fn is_running(&self, world: WorldId) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(&world)
            .is_some_and(|slot| slot.running.load(Ordering::Acquire))
    }

    /// Whether the world has a live engine holding a state.
    pub fn is_initialized(&self, world: WorldId) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(&world)
            .is_some_and(|slot| slot.initialized.load(Ordering::Acquire))
    }

    /// Queue an action for the world's next tick.
    ///
    /// Fails with [`ControlError::NotRunning`] when the world has no
    /// slot or its loop is already stopping.
    pub fn submit(&self, world: WorldId, action: WorldAction) -> Result<(), ControlError> {
        let slots = self.slots.lock().unwrap();
        let slot = slots
            .get(&world)
            .filter(|slot| slot.running.load(Ordering::Acquire))
            .ok_or(ControlError::NotRunning { world })?;
        log::debug!("world {world}: queued action {}", action.name);
        slot.actions
            .send(action)
            .map_err(|_| ControlError::NotRunning { world })
    }

    /// Ids of all worlds with a running slot, sorted.
    pub fn running_worlds(&self) -> Vec<WorldId> {
        let mut ids: Vec<_> = self
            .slots
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, slot)| slot.running.load(Ordering::Acquire))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    fn release(&self, world: WorldId, slot: &Arc<RunSlot>) {
        let mut slots = self.slots.lock().unwrap();
        if slots.get(&world).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(&world);
        }
    }
}

/// Exclusive right to run one world. Dropping it releases the world.
pub struct RunClaim {
    registry: Arc<RunRegistry>,
    world: WorldId,
    slot: Arc<RunSlot>,
    actions: Receiver<WorldAction>,
}

impl RunClaim {
    /// The claimed world.
    pub fn world(&self) -> WorldId {
        self.world
    }

    /// Whether the loop should keep going.
    pub fn is_running(&self) -> bool {
        self.slot.running.load(Ordering::Acquire)
    }

    /// Receiving end of the world's action channel.
    pub fn actions(&self) -> Receiver<WorldAction> {
        self.actions.clone()
    }

    /// Record that the run's engine now holds a state.
    pub fn mark_initialized(&self) {
        self.slot.initialized.store(true, Ordering::Release);
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.slot.running.store(false, Ordering::Release);
        self.slot.initialized.store(false, Ordering::Release);
        self.registry.release(self.world, &self.slot);
        log::debug!("world {} released", self.world);
    }
}
