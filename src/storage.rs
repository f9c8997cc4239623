use log::trace;

use crate::Slot;

/// Slot count of a freshly configured store.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Signal store exhausted: all {capacity} slots are allocated")]
    OutOfCapacity { capacity: usize },
    #[error("Slot {slot} is outside the store (capacity {capacity})")]
    OutOfRange { slot: Slot, capacity: usize },
}
pub type StoreError = Error;

/// Fixed-capacity bank of boolean signals.
///
/// Slots are handed out in increasing order and never released, so a handle
/// stays valid for as long as the store lives. Every slot reads `false` until
/// written.
#[derive(Debug, Clone)]
pub struct SignalStore {
    memory: Box<[bool]>,
    next: usize,
}

impl SignalStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: vec![false; capacity].into_boxed_slice(),
            next: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<Slot, Error> {
        if self.next == self.memory.len() {
            return Err(Error::OutOfCapacity {
                capacity: self.memory.len(),
            });
        }

        let slot = Slot(self.next);
        self.next += 1;
        trace!("allocated slot {slot}");
        Ok(slot)
    }

    pub fn get(&self, slot: Slot) -> Result<bool, Error> {
        match slot {
            Slot::UNCONNECTED => Ok(false),
            slot => self
                .memory
                .get(slot.0)
                .copied()
                .ok_or(self.out_of_range(slot)),
        }
    }

    pub fn set(&mut self, slot: Slot, value: bool) -> Result<(), Error> {
        if slot == Slot::UNCONNECTED {
            return Ok(());
        }

        let capacity = self.memory.len();
        let cell = self
            .memory
            .get_mut(slot.0)
            .ok_or(Error::OutOfRange { slot, capacity })?;
        *cell = value;
        Ok(())
    }

    /// Number of slots handed out so far
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Clears every value to `false`. Allocations are kept.
    pub fn reset(&mut self) {
        self.memory.fill(false);
    }

    fn out_of_range(&self, slot: Slot) -> Error {
        Error::OutOfRange {
            slot,
            capacity: self.memory.len(),
        }
    }
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
