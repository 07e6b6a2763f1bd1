//! Actuator control for the Rasptank robot: servo motion units, the drive,
//! status LEDs, telemetry and the command router that ties them together.

mod config;
mod error;
mod hardware;
mod leds;
mod motion;
mod movement;
mod robot;
mod router;
mod servo;
mod simulated;
mod telemetry;

pub use config::{RobotConfig, ServoConfig};
pub use error::CoreError;
pub use hardware::{LedStrip, MotorChannel, PwmController, ServoChannel};
pub use leds::{LedConfig, LedCtrl, Rgb};
pub use motion::{MotionProfile, MotionState, Rotation, physical_angle};
pub use movement::{Drive, MotorPolarity, Movement, throttles};
pub use robot::{Robot, ServoRole};
pub use router::CommandRouter;
pub use servo::{ServoSnapshot, ServoUnit, ShutdownOutcome};
pub use simulated::{MAX_SERVO_CHANNEL, SimulatedController, SimulatedLedStrip};
pub use telemetry::{FixedTelemetry, SystemInfo, SystemTelemetry, Telemetry};

/// Result type for Rasptank operations.
pub type Result<T> = std::result::Result<T, CoreError>;
