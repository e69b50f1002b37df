//! Haptic Recorder - Main Entry Point
//!
//! Usage: `haptic-recorder [CONFIG_FILE]`

use experiment_config::Experiment;
use haptic_log::RecordFile;
use recorder::{init_logging, RecorderConfig, RecordingSession, ServoSimulator};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Haptic Recorder v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RecorderConfig::load(config_path.as_deref())?;

    let experiment = match &config.experiment_path {
        Some(path) => Experiment::load(path)?,
        None => Experiment::default(),
    };

    let name = experiment
        .participant_id
        .as_deref()
        .unwrap_or(&config.default_output_name);
    let record_file = RecordFile::in_dir(&config.output_dir, name);
    let sink = record_file.create()?;

    let source = ServoSimulator::new(&config, &experiment);
    info!(
        "Presenting {} rotations over {} servo ticks",
        experiment.rotations.len(),
        source.total_ticks()
    );

    let session = RecordingSession::start(&config, sink, source)?;
    let (report, sink) = session.finish()?;

    info!(
        "Wrote {} records ({} bytes) to {}",
        report.samples_written,
        sink.into_inner().get_ref().metadata()?.len(),
        record_file.path().display()
    );

    Ok(())
}
