//! Fixed-capacity storage block

use crate::sync::{AtomicPtr, Ordering, SlotAccess};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// One link of the chain: `chunk_size` slots plus the block after it.
///
/// `next` is an owning pointer. A block frees its whole successor chain when
/// dropped, one block at a time, so long chains never recurse.
pub(crate) struct Block<T> {
    /// Element slots, written left to right by the producer
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    access: SlotAccess,
    /// Owned successor (null while this block is the tail)
    pub(crate) next: AtomicPtr<Block<T>>,
}

impl<T: Copy> Block<T> {
    /// Allocate an empty block and leak it into a raw owning pointer.
    pub(crate) fn alloc(chunk_size: usize) -> NonNull<Self> {
        let slots = (0..chunk_size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        let block = Box::new(Self {
            slots,
            access: SlotAccess::new(),
            next: AtomicPtr::new(ptr::null_mut()),
        });
        NonNull::from(Box::leak(block))
    }

    /// Free a single block, leaving its former successor alive.
    ///
    /// # Safety
    ///
    /// `block` must come from [`Block::alloc`], must not be referenced by
    /// anyone else, and its successor (if any) must already be owned elsewhere.
    pub(crate) unsafe fn free_detached(block: NonNull<Self>) {
        let owned = Box::from_raw(block.as_ptr());
        owned.next.store(ptr::null_mut(), Ordering::Relaxed);
    }

    /// Write `value` into slot `index`.
    ///
    /// # Safety
    ///
    /// The caller must be the only writer of this block, `index` must be in
    /// bounds and no reader may observe slot `index` until it is published.
    #[inline]
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.slots.len());
        self.access.write();
        (*self.slots.get_unchecked(index).get()).write(value);
    }

    /// View the first `len` slots as initialized values.
    ///
    /// # Safety
    ///
    /// The first `len` slots must have been written and published to the
    /// calling thread, and must not be written while the slice is alive.
    #[inline]
    pub(crate) unsafe fn filled(&self, len: usize) -> &[T] {
        debug_assert!(len <= self.slots.len());
        self.access.read();
        std::slice::from_raw_parts(self.slots.as_ptr().cast::<T>(), len)
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // `&mut self` is exclusive, the swaps only detach the successors
        let mut next = self.next.swap(ptr::null_mut(), Ordering::Relaxed);
        while let Some(raw) = NonNull::new(next) {
            // SAFETY: a non-null `next` is always an owning pointer from `Block::alloc`.
            let block = unsafe { Box::from_raw(raw.as_ptr()) };
            next = block.next.swap(ptr::null_mut(), Ordering::Relaxed);
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_prefix() {
        let block = Block::<u32>::alloc(4);
        unsafe {
            let block = block.as_ref();
            block.write(0, 10);
            block.write(1, 20);
            assert_eq!(block.filled(2), &[10, 20]);
        }
        unsafe { drop(Box::from_raw(block.as_ptr())) };
    }

    #[test]
    fn test_long_chain_drops_iteratively() {
        let head = Block::<u8>::alloc(1);
        let mut cur = head;
        for _ in 0..200_000 {
            let next = Block::alloc(1);
            unsafe { cur.as_ref().next.store(next.as_ptr(), Ordering::Relaxed) };
            cur = next;
        }
        // Would overflow the stack if Drop recursed
        unsafe { drop(Box::from_raw(head.as_ptr())) };
    }

    #[test]
    fn test_free_detached_keeps_successor() {
        let first = Block::<u8>::alloc(2);
        let second = Block::<u8>::alloc(2);
        unsafe {
            first.as_ref().next.store(second.as_ptr(), Ordering::Relaxed);
            Block::free_detached(first);
            second.as_ref().write(0, 7);
            assert_eq!(second.as_ref().filled(1), &[7]);
            drop(Box::from_raw(second.as_ptr()));
        }
    }
}
