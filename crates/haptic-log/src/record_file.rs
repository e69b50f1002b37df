//! `.hdata` record files
//!
//! A record file is a plain concatenation of postcard-encoded
//! [`HapticSample`]s. Every field is an `f64`, so each record takes exactly
//! [`HapticSample::ENCODED_LEN`] bytes and the file needs no header.

use crate::{HapticSample, LogError};
use chunk_buffer::PostcardSink;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extension of record files
pub const EXTENSION: &str = "hdata";

/// Sink type the recorder drains into
pub type RecordSink = PostcardSink<BufWriter<File>>;

/// Handle to a record file on disk
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    /// `<dir>/<name>.hdata`
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{name}.{EXTENSION}")),
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or truncate the file and return a sink writing into it.
    pub fn create(&self) -> Result<RecordSink, LogError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LogError::io(parent, e))?;
        }
        let file = File::create(&self.path).map_err(|e| LogError::io(&self.path, e))?;
        info!("Recording to {}", self.path.display());
        Ok(PostcardSink::new(BufWriter::new(file)))
    }

    /// Decode every record in the file.
    pub fn read_samples(&self) -> Result<Vec<HapticSample>, LogError> {
        let bytes = fs::read(&self.path).map_err(|e| LogError::io(&self.path, e))?;
        let samples = decode_samples(&bytes)?;
        debug!("Read {} samples from {}", samples.len(), self.path.display());
        Ok(samples)
    }
}

/// Decode a byte run of concatenated records.
pub fn decode_samples(bytes: &[u8]) -> Result<Vec<HapticSample>, LogError> {
    let mut samples = Vec::with_capacity(bytes.len() / HapticSample::ENCODED_LEN);
    let mut rest = bytes;

    while !rest.is_empty() {
        let offset = bytes.len() - rest.len();
        if rest.len() < HapticSample::ENCODED_LEN {
            return Err(LogError::Truncated { offset });
        }
        let (sample, tail) = postcard::take_from_bytes::<HapticSample>(rest)
            .map_err(|e| LogError::Decode {
                offset,
                message: e.to_string(),
            })?;
        samples.push(sample);
        rest = tail;
    }

    Ok(samples)
}
