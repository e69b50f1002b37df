//! Recorder configuration

use crate::RecorderError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Prefix of environment overrides, e.g. `RECORDER_CHUNK_SIZE=500`
pub const ENV_PREFIX: &str = "RECORDER";

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Samples per buffer block (default: 1000, one second at 1 kHz)
    pub chunk_size: usize,
    /// Delay between safe drains of the flusher thread
    pub flush_interval_ms: u64,
    /// Servo loop rate in Hz
    pub servo_rate_hz: f64,
    /// Pace the servo loop to `servo_rate_hz`; off runs it flat out
    pub realtime: bool,
    /// How long each reference rotation is presented
    pub seconds_per_rotation: f64,
    /// Session length cap; defaults to one window per rotation
    pub duration_secs: Option<f64>,
    /// Directory receiving the `.hdata` file
    pub output_dir: PathBuf,
    /// File stem used when the experiment has no participant id
    pub default_output_name: String,
    /// Experiment file with `ID`/`ROT` lines
    pub experiment_path: Option<PathBuf>,
    /// Extra attempts for the final drain at shutdown
    pub final_drain_retries: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            flush_interval_ms: 10,
            servo_rate_hz: 1000.0,
            realtime: true,
            seconds_per_rotation: 2.0,
            duration_secs: None,
            output_dir: PathBuf::from("."),
            default_output_name: "data".to_string(),
            experiment_path: None,
            final_drain_retries: 3,
        }
    }
}

impl RecorderConfig {
    /// Load defaults, then `path` if given, then `RECORDER_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, RecorderError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!("Loaded recorder config: {:?}", config);
        Ok(config)
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.chunk_size == 0 {
            return Err(RecorderError::InvalidConfig("chunk_size must be non-zero".into()));
        }
        if self.flush_interval_ms == 0 {
            return Err(RecorderError::InvalidConfig(
                "flush_interval_ms must be non-zero".into(),
            ));
        }
        if !(self.servo_rate_hz.is_finite() && self.servo_rate_hz > 0.0) {
            return Err(RecorderError::InvalidConfig(format!(
                "servo_rate_hz must be positive, got {}",
                self.servo_rate_hz
            )));
        }
        if !(self.seconds_per_rotation.is_finite() && self.seconds_per_rotation > 0.0) {
            return Err(RecorderError::InvalidConfig(format!(
                "seconds_per_rotation must be positive, got {}",
                self.seconds_per_rotation
            )));
        }
        if let Some(duration) = self.duration_secs {
            if !(duration.is_finite() && duration >= 0.0) {
                return Err(RecorderError::InvalidConfig(format!(
                    "duration_secs must be non-negative, got {}",
                    duration
                )));
            }
        }
        Ok(())
    }

    /// Delay between safe drains
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Time budget of one servo tick
    pub fn servo_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.servo_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_is_valid() {
        let config = RecorderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.servo_period(), Duration::from_millis(1));
    }

    #[test]
    fn test_load_toml_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("recorder-{}.toml", std::process::id()));
        fs::write(
            &path,
            "chunk_size = 250\nflush_interval_ms = 5\noutput_dir = \"/tmp/sessions\"\n",
        )
        .unwrap();

        let config = RecorderConfig::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.flush_interval(), Duration::from_millis(5));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/sessions"));
        assert_eq!(config.servo_rate_hz, 1000.0);
        assert_eq!(config.final_drain_retries, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = Path::new("/nonexistent/recorder.toml");
        assert!(matches!(
            RecorderConfig::load(Some(path)),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            RecorderConfig {
                chunk_size: 0,
                ..Default::default()
            },
            RecorderConfig {
                flush_interval_ms: 0,
                ..Default::default()
            },
            RecorderConfig {
                servo_rate_hz: -1.0,
                ..Default::default()
            },
            RecorderConfig {
                seconds_per_rotation: f64::NAN,
                ..Default::default()
            },
            RecorderConfig {
                duration_secs: Some(-2.0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(RecorderError::InvalidConfig(_))
            ));
        }
    }
}
