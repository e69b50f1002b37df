//! Simulated haptic servo loop
//!
//! Stands in for the haptic device: the end effector follows a smooth closed
//! trajectory while its orientation turns toward the current reference
//! rotation, and the manipulated object is carried by the device.

use crate::session::SampleSource;
use crate::RecorderConfig;
use experiment_config::{Experiment, Rotation};
use haptic_log::{axis_angle, mul, HapticSample, Matrix3, Vector3, IDENTITY};
use std::f64::consts::TAU;

/// Workspace radius of the simulated trajectory (m)
const AMPLITUDE: f64 = 0.03;
/// Trajectory frequency (Hz)
const TRAJECTORY_HZ: f64 = 0.5;
/// Object offset from the end effector (m)
const GRIP_OFFSET: Vector3 = [0.0, 0.0, -0.01];
const FLIP_Z: Matrix3 = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];

fn rotate(m: &Matrix3, v: Vector3) -> Vector3 {
    [0, 1, 2].map(|i| m[i][0] * v[0] + m[i][1] * v[1] + m[i][2] * v[2])
}

/// Deterministic sample generator driven by simulated time.
#[derive(Debug, Clone)]
pub struct ServoSimulator {
    rotations: Vec<Matrix3>,
    axes: Vec<(Vector3, f64)>,
    rate_hz: f64,
    seconds_per_rotation: f64,
    total_ticks: u64,
    tick: u64,
}

impl ServoSimulator {
    /// Simulator for one session of `experiment`
    pub fn new(config: &RecorderConfig, experiment: &Experiment) -> Self {
        let windows = experiment.rotations.len().max(1) as f64;
        let duration = config
            .duration_secs
            .unwrap_or(windows * config.seconds_per_rotation);

        Self {
            rotations: experiment
                .rotations
                .iter()
                .map(|r| axis_angle(r.axis, r.angle))
                .collect(),
            axes: experiment
                .rotations
                .iter()
                .map(|&Rotation { axis, angle, .. }| (axis, angle))
                .collect(),
            rate_hz: config.servo_rate_hz,
            seconds_per_rotation: config.seconds_per_rotation,
            total_ticks: (duration * config.servo_rate_hz).round() as u64,
            tick: 0,
        }
    }

    /// Samples this simulator will produce before ending
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    fn sample_at(&self, time: f64) -> HapticSample {
        let window = ((time / self.seconds_per_rotation) as usize)
            .min(self.rotations.len().saturating_sub(1));
        let current = self.rotations.get(window).zip(self.axes.get(window));
        let (reference, device_orientation) = match current {
            Some((reference, &(axis, angle))) => {
                let progress = (time / self.seconds_per_rotation - window as f64).clamp(0.0, 1.0);
                (*reference, axis_angle(axis, angle * progress))
            }
            None => (IDENTITY, IDENTITY),
        };

        let w = TAU * TRAJECTORY_HZ;
        let (s1, c1) = (w * time).sin_cos();
        let (s2, c2) = (2.0 * w * time).sin_cos();
        let device_position = [AMPLITUDE * s1, 0.5 * AMPLITUDE * s2, AMPLITUDE * (c1 - 1.0)];
        let device_velocity = [AMPLITUDE * w * c1, AMPLITUDE * w * c2, -AMPLITUDE * w * s1];

        let grip = rotate(&device_orientation, GRIP_OFFSET);
        let object_position = [
            device_position[0] + grip[0],
            device_position[1] + grip[1],
            device_position[2] + grip[2],
        ];

        HapticSample {
            time,
            reference_orientation: reference,
            object_position,
            // Grip is rigid, with the object's frame rotated 180° about the tool axis
            object_orientation: mul(&device_orientation, &FLIP_Z),
            device_orientation,
            device_position,
            device_velocity,
        }
    }
}

impl SampleSource for ServoSimulator {
    fn next_sample(&mut self) -> Option<HapticSample> {
        if self.tick >= self.total_ticks {
            return None;
        }
        let time = self.tick as f64 / self.rate_hz;
        self.tick += 1;
        Some(self.sample_at(time))
    }
}
