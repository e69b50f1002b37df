//! Haptic Sample Log
//!
//! Provides the servo-loop sample record and its on-disk `.hdata` format.

mod record_file;
mod sample;

pub use record_file::{decode_samples, RecordFile, RecordSink, EXTENSION};
pub use sample::{axis_angle, mul, HapticSample, Matrix3, Vector3, IDENTITY};

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Record file errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Truncated record at byte {offset}")]
    Truncated { offset: usize },
    #[error("Decode error at byte {offset}: {message}")]
    Decode { offset: usize, message: String },
}

impl LogError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
