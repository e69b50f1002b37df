//! Synchronization primitives, swapped for `loom` models under `--cfg loom`

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::Arc;

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::Arc;

/// Access marker for one block's slots.
///
/// Compiles to nothing normally. Under loom it is a tracked cell, so a read
/// of a block that is not ordered after the producer's writes to it is
/// reported as a data race.
pub(crate) struct SlotAccess {
    #[cfg(loom)]
    cell: loom::cell::UnsafeCell<()>,
}

impl SlotAccess {
    pub(crate) fn new() -> Self {
        Self {
            #[cfg(loom)]
            cell: loom::cell::UnsafeCell::new(()),
        }
    }

    #[inline(always)]
    pub(crate) fn write(&self) {
        #[cfg(loom)]
        self.cell.with_mut(|_| ());
    }

    #[inline(always)]
    pub(crate) fn read(&self) {
        #[cfg(loom)]
        self.cell.with(|_| ());
    }
}
