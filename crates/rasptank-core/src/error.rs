//! Error types for Rasptank.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid servo channel: {0} (expected 0-7)")]
    InvalidServoChannel(u8),

    #[error("Invalid motor index: {0} (expected 1 or 2)")]
    InvalidMotorIndex(u8),

    #[error("Invalid color sequence: '{0}' is not a permutation of 'R', 'G', 'B'")]
    InvalidColorSequence(String),

    #[error("Invalid motion profile: {0}")]
    InvalidMotionProfile(String),

    #[error("Invalid LED index: {index} (strip has {count} LEDs)")]
    InvalidLedIndex { index: usize, count: usize },

    #[error("Actuator write failed on {actuator}: {reason}")]
    ActuatorWrite { actuator: String, reason: String },

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Worker thread for {0} panicked")]
    WorkerPanicked(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
