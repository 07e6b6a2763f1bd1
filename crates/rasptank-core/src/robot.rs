//! Application context owning every actuator on the robot.

use crate::Result;
use crate::config::{RobotConfig, ServoConfig};
use crate::hardware::{LedStrip, PwmController};
use crate::leds::{LedCtrl, Rgb};
use crate::movement::Movement;
use crate::servo::{ServoUnit, ShutdownOutcome};
use crate::telemetry::{SystemInfo, Telemetry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// The five servos on the arm and camera mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServoRole {
    Arm,
    Hand,
    Wrist,
    Claw,
    Camera,
}

impl ServoRole {
    pub const ALL: [ServoRole; 5] = [
        ServoRole::Arm,
        ServoRole::Hand,
        ServoRole::Wrist,
        ServoRole::Claw,
        ServoRole::Camera,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ServoRole::Arm => "ARM",
            ServoRole::Hand => "HAND",
            ServoRole::Wrist => "WRIST",
            ServoRole::Claw => "CLAW",
            ServoRole::Camera => "CAMERA",
        }
    }

    // Position in `ALL` and in `Robot::servos`.
    fn index(self) -> usize {
        match self {
            ServoRole::Arm => 0,
            ServoRole::Hand => 1,
            ServoRole::Wrist => 2,
            ServoRole::Claw => 3,
            ServoRole::Camera => 4,
        }
    }

    fn config(self, config: &RobotConfig) -> &ServoConfig {
        match self {
            ServoRole::Arm => &config.arm,
            ServoRole::Hand => &config.hand,
            ServoRole::Wrist => &config.wrist,
            ServoRole::Claw => &config.claw,
            ServoRole::Camera => &config.camera,
        }
    }
}

/// Every actuator plus telemetry, built once at startup and shared by all sessions.
///
/// Any session may drive any unit; the last write wins.
pub struct Robot {
    servos: [ServoUnit; 5],
    movement: Movement,
    leds: Mutex<LedCtrl>,
    telemetry: Arc<dyn Telemetry>,
}

impl Robot {
    /// Open every handle and start the servo workers.
    ///
    /// Fails on the first invalid channel, motor index or LED sequence.
    pub fn new(
        controller: &dyn PwmController,
        strip: Box<dyn LedStrip>,
        telemetry: Arc<dyn Telemetry>,
        config: &RobotConfig,
    ) -> Result<Self> {
        config.motion.validate()?;
        let spawn = |role: ServoRole| -> Result<ServoUnit> {
            let servo = role.config(config);
            ServoUnit::spawn(
                role.name(),
                controller.servo(servo.channel)?,
                servo.initial_angle,
                servo.polarity,
                config.motion,
            )
        };
        let servos = [
            spawn(ServoRole::Arm)?,
            spawn(ServoRole::Hand)?,
            spawn(ServoRole::Wrist)?,
            spawn(ServoRole::Claw)?,
            spawn(ServoRole::Camera)?,
        ];

        let movement = Movement::new(
            controller.motor(1)?,
            config.motor1_polarity,
            controller.motor(2)?,
            config.motor2_polarity,
            config.default_speed,
        );

        let leds = LedCtrl::new(strip, &config.leds)?;

        info!(target: "rasptank::startup", "Robot initialised: {} servos, 2 motors, {} LEDs", servos.len(), leds.count());

        Ok(Self {
            servos,
            movement,
            leds: Mutex::new(leds),
            telemetry,
        })
    }

    pub fn servo(&self, role: ServoRole) -> &ServoUnit {
        &self.servos[role.index()]
    }

    pub fn servos(&self) -> impl Iterator<Item = (ServoRole, &ServoUnit)> {
        ServoRole::ALL.into_iter().zip(self.servos.iter())
    }

    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    /// Return every servo to its initial angle.
    pub fn home(&self) -> Result<()> {
        for (_, servo) in self.servos() {
            servo.reset()?;
        }
        Ok(())
    }

    pub fn system_info(&self) -> Result<SystemInfo> {
        self.telemetry.read()
    }

    pub fn set_status_color(&self, color: Rgb) -> Result<()> {
        self.leds.lock().unwrap().set_all(color)
    }

    pub fn with_leds<R>(&self, f: impl FnOnce(&mut LedCtrl) -> R) -> R {
        f(&mut self.leds.lock().unwrap())
    }

    /// Stop the motors, then shut down every servo worker.
    ///
    /// Returns each servo's outcome; the caller decides whether a timeout is fatal.
    pub fn shutdown(&self, timeout: Duration) -> Vec<(ServoRole, Result<ShutdownOutcome>)> {
        if let Err(e) = self.movement.stop() {
            warn!(target: "rasptank::motor", "Failed to stop motors during shutdown: {}", e);
        }
        self.servos()
            .map(|(role, servo)| (role, servo.shutdown(timeout)))
            .collect()
    }
}
