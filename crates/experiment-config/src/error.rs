//! Experiment File Error Types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading an experiment file
#[derive(Debug, Error)]
pub enum ConfError {
    /// `ROT` with the wrong number of tokens
    #[error("Line {line}: expected `ROT <x> <y> <z> <angle> DEG|RAD` or `ROT RANDOM`")]
    MalformedRotation { line: usize },

    /// Angle unit other than `DEG` or `RAD`
    #[error("Line {line}: unknown angle unit `{unit}`")]
    UnknownUnit { line: usize, unit: String },

    /// Token that should be a number
    #[error("Line {line}: invalid number `{token}`")]
    InvalidNumber { line: usize, token: String },

    /// `ID` not followed by exactly one word
    #[error("Line {line}: participant ID must be a single word")]
    InvalidId { line: usize },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
