//! Experiment file parser and writer

use crate::error::ConfError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a rotation entered the experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationSource {
    /// Axis and angle given in the file
    Explicit,
    /// `ROT RANDOM`, drawn while parsing
    Random,
}

/// Reference rotation for one sub-experiment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Rotation axis, not necessarily normalized
    pub axis: [f64; 3],
    /// Angle in radians
    pub angle: f64,
    pub source: RotationSource,
}

impl Rotation {
    /// Explicit rotation, angle in radians
    pub fn new(axis: [f64; 3], angle_rad: f64) -> Self {
        Self {
            axis,
            angle: angle_rad,
            source: RotationSource::Explicit,
        }
    }

    /// Explicit rotation, angle in degrees
    pub fn from_degrees(axis: [f64; 3], angle_deg: f64) -> Self {
        Self::new(axis, angle_deg.to_radians())
    }

    /// Axis components uniform in [-1, 1], angle uniform in [0, 2π)
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            axis: [
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            ],
            angle: rng.random_range(0.0..TAU),
            source: RotationSource::Random,
        }
    }
}

/// Participant id plus the ordered list of reference rotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub participant_id: Option<String>,
    pub rotations: Vec<Rotation>,
}

impl Experiment {
    /// Empty experiment for a participant
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: Some(participant_id.into()),
            rotations: Vec::new(),
        }
    }

    /// Read and parse an experiment file, drawing random rotations from the thread RNG.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let experiment = Self::parse(&text)?;
        info!(
            "Loaded experiment from {}: {} rotations",
            path.display(),
            experiment.rotations.len()
        );
        Ok(experiment)
    }

    /// Parse experiment text, drawing random rotations from the thread RNG.
    pub fn parse(text: &str) -> Result<Self, ConfError> {
        Self::parse_with_rng(text, &mut rand::rng())
    }

    /// Parse experiment text. Stops at the first malformed line.
    pub fn parse_with_rng<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Result<Self, ConfError> {
        let mut experiment = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            let Some(&command) = tokens.first() else {
                continue;
            };
            if command.starts_with('#') {
                continue;
            }

            match command {
                "ROT" => {
                    let rotation = parse_rotation(&tokens[1..], line, rng)?;
                    debug!("Line {}: rotation {:?}", line, rotation);
                    experiment.rotations.push(rotation);
                }
                "ID" => match tokens[1..] {
                    [id] => experiment.participant_id = Some(id.to_string()),
                    _ => return Err(ConfError::InvalidId { line }),
                },
                other => warn!("Line {}: skipping unknown command `{}`", line, other),
            }
        }

        Ok(experiment)
    }

    /// Render as experiment-file text that parses back to the same experiment.
    ///
    /// Random rotations are written as `ROT RANDOM`, so they are drawn again
    /// when the file is read.
    pub fn to_conf_string(&self) -> String {
        let mut out = String::from("# Experiment configuration\n\n");

        if let Some(id) = &self.participant_id {
            let _ = writeln!(out, "# Participant ID:\nID {}\n", id);
        }

        out.push_str("# Rotations:\n");
        for rotation in &self.rotations {
            match rotation.source {
                RotationSource::Random => out.push_str("ROT RANDOM\n"),
                RotationSource::Explicit => {
                    let [x, y, z] = rotation.axis;
                    let _ = writeln!(out, "ROT {} {} {} {} RAD", x, y, z, rotation.angle);
                }
            }
        }
        out
    }
}

fn parse_rotation<R: Rng + ?Sized>(
    args: &[&str],
    line: usize,
    rng: &mut R,
) -> Result<Rotation, ConfError> {
    match *args {
        ["RANDOM"] | ["RND"] => Ok(Rotation::random(rng)),
        [x, y, z, angle, unit] => {
            let axis = [number(x, line)?, number(y, line)?, number(z, line)?];
            let angle = number(angle, line)?;
            match unit {
                "DEG" => Ok(Rotation::from_degrees(axis, angle)),
                "RAD" => Ok(Rotation::new(axis, angle)),
                _ => Err(ConfError::UnknownUnit {
                    line,
                    unit: unit.to_string(),
                }),
            }
        }
        _ => Err(ConfError::MalformedRotation { line }),
    }
}

fn number(token: &str, line: usize) -> Result<f64, ConfError> {
    token.parse().map_err(|_| ConfError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}
