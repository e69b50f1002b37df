//! Recorder Error Types

use chunk_buffer::DrainError;
use experiment_config::ConfError;
use haptic_log::LogError;
use std::io;
use thiserror::Error;

/// Errors from configuring or running a recording session
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Experiment(#[from] ConfError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("Final drain failed after {attempts} attempts: {source}")]
    FinalDrain {
        attempts: u32,
        #[source]
        source: DrainError,
    },
}
