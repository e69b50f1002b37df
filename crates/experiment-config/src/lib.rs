//! Experiment Configuration
//!
//! Reads the line-oriented experiment file that lists the participant id and
//! the reference rotations of a session:
//!
//! ```text
//! # comment
//! ID alice
//! ROT 1 0 0 90 DEG
//! ROT 0 1 0 1.57 RAD
//! ROT RANDOM
//! ```

mod error;
mod experiment;

pub use error::ConfError;
pub use experiment::{Experiment, Rotation, RotationSource};
