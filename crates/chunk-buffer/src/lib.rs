//! Chunked Append Buffer
//!
//! Unbounded, append-only buffer for moving samples from a real-time
//! producer thread to a consumer thread that persists them. The producer
//! never locks, blocks or performs I/O; the consumer drains whole blocks that
//! the producer can no longer touch.
//!
//! ```
//! use chunk_buffer::ChunkedAppendBuffer;
//!
//! let (mut producer, mut consumer) = ChunkedAppendBuffer::new(4).split();
//! for i in 1..=7u32 {
//!     producer.append(i);
//! }
//!
//! let mut out = Vec::new();
//! consumer.drain_safe(&mut out).unwrap();
//! assert_eq!(out, [1, 2, 3, 4]);
//!
//! drop(producer);
//! consumer.drain_all(&mut out).unwrap();
//! assert_eq!(out, [1, 2, 3, 4, 5, 6, 7]);
//! ```

#![warn(missing_docs)]

mod block;
mod buffer;
mod chain;
mod error;
mod sink;
mod split;
mod sync;

pub use buffer::{ChunkedAppendBuffer, DEFAULT_CHUNK_SIZE};
pub use chain::FrozenBlocks;
pub use error::DrainError;
pub use sink::{PostcardSink, Sink};
pub use split::{Consumer, Producer};
