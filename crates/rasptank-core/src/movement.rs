//! Differential drive over two DC motors.

use crate::Result;
use crate::hardware::MotorChannel;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// Wiring polarity of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorPolarity {
    Forward,
    Reverse,
}

impl MotorPolarity {
    pub fn sign(self) -> f64 {
        match self {
            MotorPolarity::Forward => 1.0,
            MotorPolarity::Reverse => -1.0,
        }
    }
}

/// Drive pattern applied to both motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Drive {
    /// Per-motor sign before polarity and speed are applied.
    fn pattern(self) -> (f64, f64) {
        match self {
            Drive::Forward => (1.0, 1.0),
            Drive::Backward => (-1.0, -1.0),
            Drive::Left => (1.0, -1.0),
            Drive::Right => (-1.0, 1.0),
            Drive::Stop => (0.0, 0.0),
        }
    }
}

/// Compute both throttles for a drive pattern at `speed_percent`.
pub fn throttles(
    drive: Drive,
    polarities: (MotorPolarity, MotorPolarity),
    speed_percent: u8,
) -> (f64, f64) {
    let scale = f64::from(speed_percent.min(100)) / 100.0;
    let (a, b) = drive.pattern();
    (
        a * polarities.0.sign() * scale,
        b * polarities.1.sign() * scale,
    )
}

struct Motors {
    motor1: Box<dyn MotorChannel>,
    motor2: Box<dyn MotorChannel>,
}

/// Two motors and a shared speed setting.
///
/// Holds no direction state: each call rewrites both throttles.
pub struct Movement {
    motors: Mutex<Motors>,
    polarities: (MotorPolarity, MotorPolarity),
    speed: AtomicU8,
}

impl Movement {
    pub fn new(
        motor1: Box<dyn MotorChannel>,
        motor1_polarity: MotorPolarity,
        motor2: Box<dyn MotorChannel>,
        motor2_polarity: MotorPolarity,
        speed: u8,
    ) -> Self {
        Self {
            motors: Mutex::new(Motors { motor1, motor2 }),
            polarities: (motor1_polarity, motor2_polarity),
            speed: AtomicU8::new(speed.min(100)),
        }
    }

    pub fn forward(&self) -> Result<()> {
        self.drive(Drive::Forward)
    }

    pub fn backward(&self) -> Result<()> {
        self.drive(Drive::Backward)
    }

    pub fn left(&self) -> Result<()> {
        self.drive(Drive::Left)
    }

    pub fn right(&self) -> Result<()> {
        self.drive(Drive::Right)
    }

    pub fn stop(&self) -> Result<()> {
        self.drive(Drive::Stop)
    }

    /// Clamp to `[0, 100]` and store. Throttles already written are untouched.
    pub fn set_speed(&self, percent: i64) -> u8 {
        let clamped = percent.clamp(0, 100) as u8;
        self.speed.store(clamped, Ordering::Relaxed);
        debug!(target: "rasptank::motor", "Speed set to {} (requested {})", clamped, percent);
        clamped
    }

    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn drive(&self, drive: Drive) -> Result<()> {
        let (t1, t2) = throttles(drive, self.polarities, self.speed());
        debug!(target: "rasptank::motor", "{:?}: throttles ({:.2}, {:.2})", drive, t1, t2);
        let mut motors = self.motors.lock().unwrap();
        motors.motor1.set_throttle(t1)?;
        motors.motor2.set_throttle(t2)?;
        Ok(())
    }
}
