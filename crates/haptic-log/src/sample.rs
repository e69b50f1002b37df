//! Servo-loop sample record

use serde::{Deserialize, Serialize};

/// Cartesian vector (m or m/s)
pub type Vector3 = [f64; 3];

/// Row-major 3x3 rotation matrix
pub type Matrix3 = [[f64; 3]; 3];

pub const IDENTITY: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// One record produced per haptic servo tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HapticSample {
    /// Seconds since the session started
    pub time: f64,
    /// Orientation the participant is asked to match
    pub reference_orientation: Matrix3,
    /// Position of the manipulated object
    pub object_position: Vector3,
    /// Orientation of the manipulated object
    pub object_orientation: Matrix3,
    /// Device end-effector orientation
    pub device_orientation: Matrix3,
    /// Device end-effector position
    pub device_position: Vector3,
    /// Device end-effector linear velocity
    pub device_velocity: Vector3,
}

impl HapticSample {
    /// Bytes per record on disk: 37 `f64` fields, no framing
    pub const ENCODED_LEN: usize = 37 * 8;
}

/// Rotation matrix for `angle` radians about `axis` (Rodrigues' formula).
///
/// A zero axis yields the identity.
pub fn axis_angle(axis: Vector3, angle: f64) -> Matrix3 {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if norm == 0.0 {
        return IDENTITY;
    }
    let [x, y, z] = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;

    [
        [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
        [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
        [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
    ]
}

/// Matrix product `a * b`
pub fn mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
