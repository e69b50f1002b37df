//! Chunked Append Buffer Implementation

use crate::chain::{Chain, FrozenBlocks};
use crate::split::{self, Consumer, Producer};
use crate::sink::Sink;
use crate::DrainError;

/// Default block size (1000 samples = 1 s of a 1 kHz servo loop)
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Unbounded append-only buffer made of fixed-size blocks.
///
/// This single-owner form exposes every operation through `&mut self`. Use
/// [`ChunkedAppendBuffer::split`] to hand the producer and consumer roles to
/// two threads.
pub struct ChunkedAppendBuffer<T: Copy> {
    chain: Chain<T>,
}

impl<T: Copy> ChunkedAppendBuffer<T> {
    /// Create an empty buffer with blocks of `chunk_size` elements.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chain: Chain::new(chunk_size),
        }
    }

    /// Create a buffer with the default block size (1000 elements)
    pub fn with_default_chunk_size() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }

    pub(crate) fn from_chain(chain: Chain<T>) -> Self {
        Self { chain }
    }

    /// Append an element and return the number of buffered elements.
    pub fn append(&mut self, value: T) -> usize {
        // SAFETY: `&mut self` makes this the only producer and rules out a
        // concurrent consumer.
        unsafe { self.chain.push(value) }
    }

    /// Flush every full block that precedes the tail, keeping the tail.
    ///
    /// Returns the number of elements written.
    pub fn drain_safe<S>(&mut self, sink: &mut S) -> Result<usize, DrainError>
    where
        S: Sink<T> + ?Sized,
    {
        // SAFETY: exclusive access through `&mut self`.
        let written = unsafe { self.chain.write_frozen(sink)? };
        sink.flush()?;
        Ok(written)
    }

    /// Flush everything, the partial tail included, and reset to empty.
    ///
    /// Returns the number of elements written.
    pub fn drain_all<S>(&mut self, sink: &mut S) -> Result<usize, DrainError>
    where
        S: Sink<T> + ?Sized,
    {
        // SAFETY: exclusive access through `&mut self`.
        let written = unsafe { self.chain.write_all(sink)? };
        sink.flush()?;
        Ok(written)
    }

    /// Discard all buffered elements without writing them
    pub fn clear(&mut self) {
        // SAFETY: exclusive access through `&mut self`.
        unsafe { self.chain.reset() }
    }

    /// Number of buffered elements
    pub fn size(&self) -> usize {
        self.chain.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Elements per block
    pub fn chunk_size(&self) -> usize {
        self.chain.chunk_size()
    }

    /// Number of linked blocks, the tail included
    pub fn block_count(&self) -> usize {
        // SAFETY: no producer can run while `&self` is borrowed from a sole owner.
        unsafe { self.chain.block_count() }
    }

    /// Iterate the full blocks before the tail, oldest first.
    pub fn frozen_blocks(&self) -> FrozenBlocks<'_, T> {
        // SAFETY: freeing requires `&mut self`, which the iterator's borrow excludes.
        unsafe { self.chain.frozen_blocks() }
    }

    /// Split into a producer handle and a consumer handle.
    pub fn split(self) -> (Producer<T>, Consumer<T>)
    where
        T: Send + Sync,
    {
        split::split(self.chain)
    }
}

impl<T: Copy> Default for ChunkedAppendBuffer<T> {
    fn default() -> Self {
        Self::with_default_chunk_size()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::io;

    /// Sink that fails on the n-th block write
    struct FailingSink {
        accepted: Vec<u32>,
        calls: usize,
        fail_on: usize,
    }

    impl Sink<u32> for FailingSink {
        fn write_block(&mut self, items: &[u32]) -> io::Result<()> {
            self.calls += 1;
            if self.calls == self.fail_on {
                return Err(io::Error::from_raw_os_error(28));
            }
            self.accepted.extend_from_slice(items);
            Ok(())
        }
    }

    #[test]
    fn test_append_returns_total() {
        let mut buffer = ChunkedAppendBuffer::new(3);
        for i in 0..7u32 {
            assert_eq!(buffer.append(i), i as usize + 1);
        }
        assert_eq!(buffer.size(), 7);
        assert_eq!(buffer.block_count(), 3);
    }

    #[test]
    fn test_scenario_chunk_four() {
        let mut buffer = ChunkedAppendBuffer::new(4);
        for i in 1..=7u32 {
            buffer.append(i);
        }

        let mut sink = Vec::new();
        assert_eq!(buffer.drain_safe(&mut sink).unwrap(), 4);
        assert_eq!(sink, vec![1, 2, 3, 4]);
        assert_eq!(buffer.size(), 3);

        sink.clear();
        assert_eq!(buffer.drain_all(&mut sink).unwrap(), 3);
        assert_eq!(sink, vec![5, 6, 7]);
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_exact_multiple_flushes_every_block() {
        let mut buffer = ChunkedAppendBuffer::new(4);
        for i in 0..8u32 {
            buffer.append(i);
        }
        assert_eq!(buffer.block_count(), 3);

        let mut sink = Vec::new();
        assert_eq!(buffer.drain_safe(&mut sink).unwrap(), 8);
        assert_eq!(sink, (0..8u32).collect::<Vec<_>>());
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.block_count(), 1);

        buffer.append(8);
        assert_eq!(buffer.drain_safe(&mut sink).unwrap(), 0);
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_drain_all_on_empty() {
        let mut buffer = ChunkedAppendBuffer::<u32>::new(4);
        let mut sink = Vec::new();
        assert_eq!(buffer.drain_all(&mut sink).unwrap(), 0);
        assert_eq!(buffer.drain_all(&mut sink).unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = ChunkedAppendBuffer::new(2);
        for i in 0..5u32 {
            buffer.append(i);
        }
        buffer.clear();
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.block_count(), 1);

        assert_eq!(buffer.append(42), 1);
        let mut sink = Vec::new();
        buffer.drain_all(&mut sink).unwrap();
        assert_eq!(sink, vec![42]);
    }

    #[test]
    fn test_sink_failure_keeps_suffix() {
        let mut buffer = ChunkedAppendBuffer::new(2);
        for i in 0..7u32 {
            buffer.append(i);
        }

        let mut failing = FailingSink {
            accepted: Vec::new(),
            calls: 0,
            fail_on: 2,
        };
        let err = buffer.drain_safe(&mut failing).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(28));
        assert_eq!(failing.accepted, vec![0, 1]);
        assert_eq!(buffer.size(), 5);

        let mut sink = Vec::new();
        buffer.drain_all(&mut sink).unwrap();
        assert_eq!(sink, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_failed_tail_write_is_retried() {
        let mut buffer = ChunkedAppendBuffer::new(4);
        buffer.append(1u32);
        buffer.append(2);

        let mut failing = FailingSink {
            accepted: Vec::new(),
            calls: 0,
            fail_on: 1,
        };
        assert!(buffer.drain_all(&mut failing).is_err());
        assert_eq!(buffer.size(), 2);

        let mut sink = Vec::new();
        buffer.drain_all(&mut sink).unwrap();
        assert_eq!(sink, vec![1, 2]);
    }

    #[test]
    fn test_frozen_blocks_skip_tail() {
        let mut buffer = ChunkedAppendBuffer::new(3);
        for i in 0..8u32 {
            buffer.append(i);
        }

        let blocks: Vec<&[u32]> = buffer.frozen_blocks().collect();
        assert_eq!(blocks, vec![&[0, 1, 2][..], &[3, 4, 5][..]]);

        // Restartable
        assert_eq!(buffer.frozen_blocks().count(), 2);
    }

    #[test]
    #[should_panic(expected = "chunk size must be non-zero")]
    fn test_zero_chunk_size_panics() {
        let _ = ChunkedAppendBuffer::<u8>::new(0);
    }
}
