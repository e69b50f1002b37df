//! Haptic Recorder
//!
//! Records a haptic experiment: a servo loop produces one [`HapticSample`]
//! per tick into a lock-free chunked buffer while a flusher thread writes
//! finished blocks to a `.hdata` file.
//!
//! [`HapticSample`]: haptic_log::HapticSample

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod error;
mod session;
mod settings;
mod simulator;

pub use error::RecorderError;
pub use session::{RecordingSession, SampleSource, SessionReport};
pub use settings::{RecorderConfig, ENV_PREFIX};
pub use simulator::ServoSimulator;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_names(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
