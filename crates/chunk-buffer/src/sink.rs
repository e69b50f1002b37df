//! Drain destinations

use serde::Serialize;
use std::io::{self, Write};

/// Destination for drained blocks.
///
/// Receives runs of at most `chunk_size` elements, in append order. An
/// implementation must not reorder calls.
pub trait Sink<T> {
    /// Persist one run of elements.
    fn write_block(&mut self, items: &[T]) -> io::Result<()>;

    /// Called once after every successful drain.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Copy> Sink<T> for Vec<T> {
    fn write_block(&mut self, items: &[T]) -> io::Result<()> {
        self.extend_from_slice(items);
        Ok(())
    }
}

impl<T, S: Sink<T> + ?Sized> Sink<T> for &mut S {
    fn write_block(&mut self, items: &[T]) -> io::Result<()> {
        (**self).write_block(items)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Sink that encodes every element with postcard into a byte writer.
///
/// Each block is encoded into a scratch buffer first and handed to the
/// writer in one `write_all`. That call can fail after part of the block
/// has already reached the writer; the block stays buffered, so a retried
/// drain writes it again after that partial prefix.
pub struct PostcardSink<W> {
    writer: W,
    scratch: Vec<u8>,
    records: u64,
}

impl<W: Write> PostcardSink<W> {
    /// Wrap a byte writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scratch: Vec::new(),
            records: 0,
        }
    }

    /// Records handed to the writer so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Get a reference to the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<T: Serialize, W: Write> Sink<T> for PostcardSink<W> {
    fn write_block(&mut self, items: &[T]) -> io::Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        for item in items {
            scratch = postcard::to_extend(item, scratch)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        }
        let result = self.writer.write_all(&scratch);
        self.scratch = scratch;
        result?;
        self.records += items.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
