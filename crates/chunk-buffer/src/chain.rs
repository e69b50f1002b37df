//! Shared block chain behind both buffer front-ends
//!
//! The chain itself is not role-aware. Every mutating method is `unsafe` and
//! states which role may call it; `ChunkedAppendBuffer` upholds the contract
//! through `&mut self`, `Producer`/`Consumer` through handle uniqueness.

use crate::block::Block;
use crate::sink::Sink;
use crate::sync::{AtomicPtr, AtomicUsize, Ordering};
use std::cell::UnsafeCell;
use std::io;
use std::marker::PhantomData;
use std::ptr::NonNull;

pub(crate) struct Chain<T> {
    /// Elements per block
    chunk_size: usize,
    /// Oldest block, owned by the chain (consumer side only)
    head: UnsafeCell<NonNull<Block<T>>>,
    /// Block being filled; non-owning, published by the producer
    tail: AtomicPtr<Block<T>>,
    /// Valid elements in `tail`, always below `chunk_size`
    tail_len: AtomicUsize,
    /// Appended and not yet drained
    len: AtomicUsize,
}

impl<T: Copy> Chain<T> {
    pub(crate) fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        let block = Block::alloc(chunk_size);
        Self {
            chunk_size,
            head: UnsafeCell::new(block),
            tail: AtomicPtr::new(block.as_ptr()),
            tail_len: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Append one element. The append that fills the tail also links and
    /// publishes a fresh empty tail, so a full block is never the tail.
    ///
    /// # Safety
    ///
    /// Producer role only: at most one thread may call `push` at a time, and
    /// never concurrently with `reset` or `write_all`.
    #[inline]
    pub(crate) unsafe fn push(&self, value: T) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let index = self.tail_len.load(Ordering::Relaxed);

        (*tail).write(index, value);
        let total = self.len.fetch_add(1, Ordering::AcqRel) + 1;

        if index + 1 == self.chunk_size {
            let fresh = Block::alloc(self.chunk_size);
            // Link first, then publish: a consumer that sees the new tail
            // also sees the link and every write into the old tail.
            (*tail).next.store(fresh.as_ptr(), Ordering::Release);
            self.tail.store(fresh.as_ptr(), Ordering::Release);
            self.tail_len.store(0, Ordering::Release);
        } else {
            self.tail_len.store(index + 1, Ordering::Release);
        }

        total
    }

    /// Write and free every block strictly before the tail seen at entry.
    ///
    /// Returns the number of elements written. On a sink error the failing
    /// block and everything after it stay linked.
    ///
    /// # Safety
    ///
    /// Consumer role only: at most one thread may call the consumer methods
    /// at a time. May run concurrently with `push`.
    pub(crate) unsafe fn write_frozen<S>(&self, sink: &mut S) -> io::Result<usize>
    where
        S: Sink<T> + ?Sized,
    {
        let frozen_tail = self.tail.load(Ordering::Acquire);
        let head = &mut *self.head.get();
        let mut written = 0;

        while head.as_ptr() != frozen_tail {
            let block = head.as_ref();
            sink.write_block(block.filled(self.chunk_size))?;

            // A superseded block always has a successor.
            let Some(next) = NonNull::new(block.next.load(Ordering::Acquire)) else {
                break;
            };
            let done = std::mem::replace(head, next);
            Block::free_detached(done);

            self.len.fetch_sub(self.chunk_size, Ordering::AcqRel);
            written += self.chunk_size;
        }

        Ok(written)
    }

    /// Write every block including the partial tail, then reset.
    ///
    /// # Safety
    ///
    /// Exclusive access: the producer must have stopped for good and its
    /// last `push` must happen-before this call.
    pub(crate) unsafe fn write_all<S>(&self, sink: &mut S) -> io::Result<usize>
    where
        S: Sink<T> + ?Sized,
    {
        let mut written = self.write_frozen(sink)?;

        let tail = &*self.tail.load(Ordering::Acquire);
        let tail_len = self.tail_len.load(Ordering::Acquire);
        if tail_len > 0 {
            sink.write_block(tail.filled(tail_len))?;
            written += tail_len;
        }

        self.reset();
        Ok(written)
    }

    /// Free the whole chain and start over with one empty block.
    ///
    /// # Safety
    ///
    /// Exclusive access, as for [`Chain::write_all`].
    pub(crate) unsafe fn reset(&self) {
        let fresh = Block::alloc(self.chunk_size);
        let old = std::mem::replace(&mut *self.head.get(), fresh);
        self.tail.store(fresh.as_ptr(), Ordering::Release);
        self.tail_len.store(0, Ordering::Release);
        self.len.store(0, Ordering::Release);
        drop(Box::from_raw(old.as_ptr()));
    }

    /// Number of blocks currently linked from the head.
    ///
    /// # Safety
    ///
    /// Consumer role only.
    pub(crate) unsafe fn block_count(&self) -> usize {
        let mut count = 1;
        let mut cur = (*self.head.get()).as_ref();
        while let Some(next) = NonNull::new(cur.next.load(Ordering::Acquire)) {
            count += 1;
            cur = next.as_ref();
        }
        count
    }

    /// Iterate the blocks that were frozen when this call was made.
    ///
    /// # Safety
    ///
    /// Consumer role only, and no consumer method may free blocks while the
    /// iterator is alive (the borrow on the front-end enforces this).
    pub(crate) unsafe fn frozen_blocks(&self) -> FrozenBlocks<'_, T> {
        FrozenBlocks {
            cur: *self.head.get(),
            stop: self.tail.load(Ordering::Acquire),
            chunk_size: self.chunk_size,
            _chain: PhantomData,
        }
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        // SAFETY: the chain owns `head`; `&mut self` rules out other users.
        unsafe { drop(Box::from_raw(self.head.get_mut().as_ptr())) };
    }
}

// SAFETY: the producer and consumer touch disjoint blocks, with the tail
// pointer published through Release/Acquire. Elements cross threads by
// value (`T: Send`), and `frozen_blocks` lends `&T` through a shared
// handle (`T: Sync`).
unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send + Sync> Sync for Chain<T> {}

/// Forward-only iterator over full, frozen blocks.
///
/// Yields each block as a `chunk_size` slice, oldest first, and stops at the
/// block that was the tail when the iterator was created.
pub struct FrozenBlocks<'a, T> {
    cur: NonNull<Block<T>>,
    stop: *mut Block<T>,
    chunk_size: usize,
    _chain: PhantomData<&'a Chain<T>>,
}

impl<'a, T: Copy> Iterator for FrozenBlocks<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.as_ptr() == self.stop {
            return None;
        }
        // SAFETY: blocks before `stop` are frozen and stay linked while `'a` lives.
        unsafe {
            let block: &'a Block<T> = &*self.cur.as_ptr();
            self.cur = NonNull::new(block.next.load(Ordering::Acquire))?;
            Some(block.filled(self.chunk_size))
        }
    }
}
