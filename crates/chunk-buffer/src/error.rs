//! Drain Error Types

use std::io;
use thiserror::Error;

/// Errors returned by drain operations
#[derive(Debug, Error)]
pub enum DrainError {
    /// The sink rejected a block; it and everything after it are still buffered
    #[error("Sink write failed: {0}")]
    Sink(#[from] io::Error),

    /// Full drain or clear attempted while the producer handle is alive
    #[error("Producer is still active")]
    ProducerActive,
}

impl DrainError {
    /// OS error code of a failed sink write, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Sink(e) => e.raw_os_error(),
            Self::ProducerActive => None,
        }
    }
}
