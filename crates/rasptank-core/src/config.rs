//! Robot wiring and tuning.

use crate::leds::LedConfig;
use crate::motion::{MotionProfile, Rotation};
use crate::movement::MotorPolarity;
use serde::{Deserialize, Serialize};

/// One servo's channel, start angle and wiring polarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub channel: u8,
    #[serde(default = "default_initial_angle")]
    pub initial_angle: f64,
    #[serde(default = "default_polarity")]
    pub polarity: Rotation,
}

fn default_initial_angle() -> f64 {
    90.0
}

fn default_polarity() -> Rotation {
    Rotation::Clockwise
}

impl ServoConfig {
    pub fn on_channel(channel: u8) -> Self {
        Self {
            channel,
            initial_angle: default_initial_angle(),
            polarity: default_polarity(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.polarity = Rotation::Anticlockwise;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default = "default_arm")]
    pub arm: ServoConfig,
    #[serde(default = "default_hand")]
    pub hand: ServoConfig,
    #[serde(default = "default_wrist")]
    pub wrist: ServoConfig,
    #[serde(default = "default_claw")]
    pub claw: ServoConfig,
    #[serde(default = "default_camera")]
    pub camera: ServoConfig,
    #[serde(default)]
    pub motion: MotionProfile,
    #[serde(default = "default_motor_polarity")]
    pub motor1_polarity: MotorPolarity,
    #[serde(default = "default_motor_polarity")]
    pub motor2_polarity: MotorPolarity,
    /// Drive speed in percent until a client changes it.
    #[serde(default = "default_speed")]
    pub default_speed: u8,
    #[serde(default)]
    pub leds: LedConfig,
}

fn default_arm() -> ServoConfig {
    ServoConfig::on_channel(0)
}

fn default_hand() -> ServoConfig {
    ServoConfig::on_channel(1).reversed()
}

fn default_wrist() -> ServoConfig {
    ServoConfig::on_channel(2)
}

// Channel 3 is unusable on the reference board.
fn default_claw() -> ServoConfig {
    ServoConfig::on_channel(5)
}

fn default_camera() -> ServoConfig {
    ServoConfig::on_channel(4)
}

fn default_motor_polarity() -> MotorPolarity {
    MotorPolarity::Reverse
}

fn default_speed() -> u8 {
    100
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            arm: default_arm(),
            hand: default_hand(),
            wrist: default_wrist(),
            claw: default_claw(),
            camera: default_camera(),
            motion: MotionProfile::default(),
            motor1_polarity: default_motor_polarity(),
            motor2_polarity: default_motor_polarity(),
            default_speed: default_speed(),
            leds: LedConfig::default(),
        }
    }
}
