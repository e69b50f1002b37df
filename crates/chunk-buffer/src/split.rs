//! Producer and consumer halves of a split buffer

use crate::buffer::ChunkedAppendBuffer;
use crate::chain::{Chain, FrozenBlocks};
use crate::sink::Sink;
use crate::sync::{Arc, AtomicBool, Ordering};
use crate::DrainError;

struct Shared<T> {
    chain: Chain<T>,
    /// Cleared with Release when the producer handle is dropped
    producer_active: AtomicBool,
}

pub(crate) fn split<T: Copy + Send + Sync>(chain: Chain<T>) -> (Producer<T>, Consumer<T>) {
    let shared = Arc::new(Shared {
        chain,
        producer_active: AtomicBool::new(true),
    });
    let producer = Producer {
        shared: Arc::clone(&shared),
        appended: 0,
    };
    (producer, Consumer { shared })
}

/// The only handle allowed to append.
///
/// Appending never blocks, never locks and never performs I/O. Dropping the
/// producer marks it as permanently stopped, which unlocks
/// [`Consumer::drain_all`] and [`Consumer::clear`].
pub struct Producer<T: Copy> {
    shared: Arc<Shared<T>>,
    /// Lifetime append count, not reduced by drains
    appended: u64,
}

impl<T: Copy> Producer<T> {
    /// Append an element and return the number of buffered elements.
    #[inline]
    pub fn append(&mut self, value: T) -> usize {
        self.appended += 1;
        // SAFETY: `Producer` is unique and `append` takes `&mut self`; the
        // consumer never runs `reset`/`write_all` while this handle lives.
        unsafe { self.shared.chain.push(value) }
    }

    /// Buffered elements (advisory while the consumer drains)
    pub fn size(&self) -> usize {
        self.shared.chain.len()
    }

    /// Elements appended through this handle since the split
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    /// Elements per block
    pub fn chunk_size(&self) -> usize {
        self.shared.chain.chunk_size()
    }
}

impl<T: Copy> Drop for Producer<T> {
    fn drop(&mut self) {
        self.shared.producer_active.store(false, Ordering::Release);
    }
}

/// The only handle allowed to drain.
///
/// [`Consumer::drain_safe`] may run while the producer appends.
/// [`Consumer::drain_all`] and [`Consumer::clear`] refuse to run until the
/// producer handle has been dropped.
pub struct Consumer<T: Copy> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy> Consumer<T> {
    /// Flush every full block that precedes the tail seen at entry.
    ///
    /// Never touches the block the producer is filling. Returns the number
    /// of elements written.
    pub fn drain_safe<S>(&mut self, sink: &mut S) -> Result<usize, DrainError>
    where
        S: Sink<T> + ?Sized,
    {
        // SAFETY: `Consumer` is unique and this takes `&mut self`.
        let written = unsafe { self.shared.chain.write_frozen(sink)? };
        sink.flush()?;
        Ok(written)
    }

    /// Flush everything, the partial tail included, and reset to empty.
    ///
    /// Fails with [`DrainError::ProducerActive`] while the producer lives.
    pub fn drain_all<S>(&mut self, sink: &mut S) -> Result<usize, DrainError>
    where
        S: Sink<T> + ?Sized,
    {
        self.ensure_producer_stopped()?;
        // SAFETY: the producer is gone and its appends happen-before the
        // Acquire load above.
        let written = unsafe { self.shared.chain.write_all(sink)? };
        sink.flush()?;
        Ok(written)
    }

    /// Discard all buffered elements once the producer has stopped.
    pub fn clear(&mut self) -> Result<(), DrainError> {
        self.ensure_producer_stopped()?;
        // SAFETY: as for `drain_all`.
        unsafe { self.shared.chain.reset() };
        Ok(())
    }

    /// Buffered elements (advisory while the producer appends)
    pub fn size(&self) -> usize {
        self.shared.chain.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Elements per block
    pub fn chunk_size(&self) -> usize {
        self.shared.chain.chunk_size()
    }

    /// Number of linked blocks at some instant during the call
    pub fn block_count(&self) -> usize {
        // SAFETY: only the consumer frees blocks, and it is borrowed here.
        unsafe { self.shared.chain.block_count() }
    }

    /// Iterate the blocks frozen at the time of the call, oldest first.
    pub fn frozen_blocks(&self) -> FrozenBlocks<'_, T> {
        // SAFETY: draining needs `&mut self`, excluded by the returned borrow.
        unsafe { self.shared.chain.frozen_blocks() }
    }

    /// False once the producer handle has been dropped
    pub fn is_producer_active(&self) -> bool {
        self.shared.producer_active.load(Ordering::Acquire)
    }

    /// Take back single ownership once the producer has been dropped.
    ///
    /// Returns the consumer unchanged if the producer is still around.
    pub fn into_buffer(self) -> Result<ChunkedAppendBuffer<T>, Self> {
        if self.is_producer_active() {
            return Err(self);
        }
        match Arc::try_unwrap(self.shared) {
            Ok(shared) => Ok(ChunkedAppendBuffer::from_chain(shared.chain)),
            Err(shared) => Err(Self { shared }),
        }
    }

    fn ensure_producer_stopped(&self) -> Result<(), DrainError> {
        if self.is_producer_active() {
            Err(DrainError::ProducerActive)
        } else {
            Ok(())
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_all_refused_while_producer_alive() {
        let (mut producer, mut consumer) = ChunkedAppendBuffer::new(4).split();
        producer.append(1u32);

        let mut sink = Vec::new();
        assert!(matches!(
            consumer.drain_all(&mut sink),
            Err(DrainError::ProducerActive)
        ));
        assert!(matches!(consumer.clear(), Err(DrainError::ProducerActive)));
        assert_eq!(consumer.size(), 1);

        drop(producer);
        assert_eq!(consumer.drain_all(&mut sink).unwrap(), 1);
        assert_eq!(sink, vec![1]);
    }

    #[test]
    fn test_drain_safe_leaves_tail_to_producer() {
        let (mut producer, mut consumer) = ChunkedAppendBuffer::new(4).split();
        for i in 1..=7u32 {
            producer.append(i);
        }

        let mut sink = Vec::new();
        consumer.drain_safe(&mut sink).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);

        // Tail keeps filling after the drain
        producer.append(8);
        producer.append(9);
        consumer.drain_safe(&mut sink).unwrap();
        assert_eq!(sink, (1..=8u32).collect::<Vec<_>>());
        assert_eq!(producer.total_appended(), 9);
        assert_eq!(producer.size(), 1);
    }

    #[test]
    fn test_handles_cross_threads_for_sync_elements() {
        fn assert_send<H: Send>(_: &H) {}

        let (producer, consumer) = ChunkedAppendBuffer::<u64>::new(4).split();
        assert_send(&producer);
        assert_send(&consumer);
    }

    #[test]
    fn test_into_buffer_after_producer_exits() {
        let (mut producer, consumer) = ChunkedAppendBuffer::new(2).split();
        let consumer = match consumer.into_buffer() {
            Ok(_) => panic!("producer still alive"),
            Err(consumer) => consumer,
        };

        let handle = thread::spawn(move || {
            for i in 0..5u64 {
                producer.append(i);
            }
        });
        handle.join().unwrap();

        let mut buffer = match consumer.into_buffer() {
            Ok(buffer) => buffer,
            Err(_) => panic!("producer already dropped"),
        };
        assert_eq!(buffer.size(), 5);
        assert_eq!(buffer.block_count(), 3);

        let mut sink = Vec::new();
        buffer.drain_all(&mut sink).unwrap();
        assert_eq!(sink, vec![0, 1, 2, 3, 4]);
    }
}
