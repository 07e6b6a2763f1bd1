//! Angle state machine for one servo.
//!
//! Pure and single-threaded: [`ServoUnit`](crate::ServoUnit) owns one of these
//! behind its lock and drives [`MotionState::tick`] from its worker thread.
//!
//! Angles snap to whole degrees with ties going to the even degree.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rotation sense, used both for wiring polarity and for motion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Clockwise,
    Anticlockwise,
}

impl Rotation {
    pub fn sign(self) -> f64 {
        match self {
            Rotation::Clockwise => 1.0,
            Rotation::Anticlockwise => -1.0,
        }
    }

    /// Combine a requested direction with a wiring polarity.
    pub fn combine(self, polarity: Rotation) -> Rotation {
        if self == polarity {
            Rotation::Clockwise
        } else {
            Rotation::Anticlockwise
        }
    }
}

/// Stepping parameters shared by every servo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Lower bound of the angle range, in degrees.
    #[serde(default = "default_min_angle")]
    pub min_angle: f64,
    /// Upper bound of the angle range, in degrees.
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
    /// Degrees per step for step-count moves.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Worker tick cadence.
    #[serde(default = "default_step_period_ms")]
    pub step_period_ms: u64,
    /// Base angular speed at a speed multiplier of 1.
    #[serde(default = "default_degrees_per_second")]
    pub degrees_per_second: f64,
}

fn default_min_angle() -> f64 {
    0.0
}

fn default_max_angle() -> f64 {
    180.0
}

fn default_step_size() -> f64 {
    1.0
}

fn default_step_period_ms() -> u64 {
    20
}

fn default_degrees_per_second() -> f64 {
    45.0
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            min_angle: default_min_angle(),
            max_angle: default_max_angle(),
            step_size: default_step_size(),
            step_period_ms: default_step_period_ms(),
            degrees_per_second: default_degrees_per_second(),
        }
    }
}

impl MotionProfile {
    pub fn step_period(&self) -> Duration {
        Duration::from_millis(self.step_period_ms)
    }

    /// Reject profiles a worker cannot step with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(CoreError::InvalidMotionProfile(reason));
        if !self.min_angle.is_finite() || !self.max_angle.is_finite() {
            return invalid(format!(
                "angle range [{}, {}] must be finite",
                self.min_angle, self.max_angle
            ));
        }
        if self.min_angle >= self.max_angle {
            return invalid(format!(
                "min_angle {} must be below max_angle {}",
                self.min_angle, self.max_angle
            ));
        }
        if self.step_period_ms == 0 {
            return invalid("step_period_ms must be greater than 0".to_string());
        }
        if !self.degrees_per_second.is_finite() || self.degrees_per_second <= 0.0 {
            return invalid(format!(
                "degrees_per_second {} must be a positive number",
                self.degrees_per_second
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return invalid(format!(
                "step_size {} must be a positive number",
                self.step_size
            ));
        }
        Ok(())
    }
}

/// Angle rounded to the whole degree sent to the hardware.
pub fn physical_angle(angle: f64) -> u8 {
    angle.round_ties_even().clamp(0.0, u8::MAX as f64) as u8
}

/// Current/target angle pair plus the pause flag of one servo.
#[derive(Debug, Clone)]
pub struct MotionState {
    current: f64,
    target: f64,
    initial: f64,
    polarity: Rotation,
    motion: Rotation,
    speed: f64,
    active: bool,
    profile: MotionProfile,
}

impl MotionState {
    pub fn new(initial: f64, polarity: Rotation, profile: MotionProfile) -> Self {
        Self {
            current: initial,
            target: initial,
            initial,
            polarity,
            motion: polarity,
            speed: 1.0,
            active: false,
            profile,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn polarity(&self) -> Rotation {
        self.polarity
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    /// Head for an absolute angle. Out-of-range targets are clamped while stepping.
    pub fn move_to(&mut self, angle: f64) {
        self.speed = 1.0;
        self.target = angle;
        self.motion = if angle > self.current {
            Rotation::Clockwise
        } else {
            Rotation::Anticlockwise
        };
        self.active = true;
    }

    /// Sweep in a direction, either to the range bound or by a number of steps.
    pub fn move_directional(&mut self, direction: Rotation, speed: f64, steps: Option<u32>) {
        self.motion = direction.combine(self.polarity);
        self.speed = speed;
        self.target = match steps {
            None => match self.motion {
                Rotation::Clockwise => self.profile.max_angle,
                Rotation::Anticlockwise => self.profile.min_angle,
            },
            Some(steps) => (self.current
                + self.motion.sign() * f64::from(steps) * self.profile.step_size)
                .round_ties_even(),
        };
        self.active = true;
    }

    /// Freeze at the rounded current angle. Returns the angle to write.
    pub fn stop(&mut self) -> u8 {
        self.pause();
        self.target = self.current.round_ties_even();
        self.set_angle(self.target)
    }

    /// Return to the initial angle. Returns the angle to write.
    pub fn reset(&mut self) -> u8 {
        self.pause();
        self.target = self.initial;
        self.set_angle(self.initial)
    }

    /// Shift the angle by `delta` degrees right away. Returns the angle to write.
    pub fn nudge(&mut self, delta: f64) -> u8 {
        self.target = self.current + delta;
        self.set_angle(self.target)
    }

    /// Advance one step if active. Returns the angle to write, if any.
    pub fn tick(&mut self) -> Option<u8> {
        if !self.active {
            return None;
        }
        let increment = self.motion.sign()
            * self.speed
            * self.profile.degrees_per_second
            * self.profile.step_period().as_secs_f64();
        Some(self.set_angle(self.current + increment))
    }

    fn set_angle(&mut self, angle: f64) -> u8 {
        self.current = self.sanitize(angle);
        physical_angle(self.current)
    }

    // Goal-reached is checked before the range bounds. A goal outside the
    // range still lands on the bound.
    fn sanitize(&mut self, angle: f64) -> f64 {
        let overshoot = match self.motion {
            Rotation::Clockwise => angle > self.target,
            Rotation::Anticlockwise => angle < self.target,
        };
        if overshoot {
            self.pause();
            self.target = self
                .target
                .clamp(self.profile.min_angle, self.profile.max_angle);
            return self.target;
        }
        if angle > self.profile.max_angle {
            self.pause();
            self.target = self.profile.max_angle;
            return self.profile.max_angle;
        }
        if angle < self.profile.min_angle {
            self.pause();
            self.target = self.profile.min_angle;
            return self.profile.min_angle;
        }
        angle
    }
}
