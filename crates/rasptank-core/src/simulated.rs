//! In-memory hardware backend.
//!
//! Records what the control logic commands so it can be inspected, and lets
//! callers inject write failures. Used by the server when no board is attached
//! and by tests.

use crate::hardware::{LedStrip, MotorChannel, PwmController, ServoChannel};
use crate::{CoreError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Highest servo channel exposed by the board.
pub const MAX_SERVO_CHANNEL: u8 = 7;

#[derive(Debug, Default)]
struct SimState {
    servo_angles: HashMap<u8, u8>,
    servo_writes: HashMap<u8, usize>,
    motor_throttles: HashMap<u8, f64>,
    led_frame: Vec<u8>,
    led_closed: bool,
    failing_servos: HashSet<u8>,
    failing_motors: HashSet<u8>,
}

/// Simulated PWM board plus LED strip sharing one recorded state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last angle written to a servo channel.
    pub fn servo_angle(&self, channel: u8) -> Option<u8> {
        self.state.lock().unwrap().servo_angles.get(&channel).copied()
    }

    /// Number of angle writes a servo channel has received.
    pub fn servo_writes(&self, channel: u8) -> usize {
        self.state
            .lock()
            .unwrap()
            .servo_writes
            .get(&channel)
            .copied()
            .unwrap_or(0)
    }

    /// Last throttle written to a motor.
    pub fn motor_throttle(&self, index: u8) -> Option<f64> {
        self.state.lock().unwrap().motor_throttles.get(&index).copied()
    }

    /// Last frame pushed to the LED strip.
    pub fn led_frame(&self) -> Vec<u8> {
        self.state.lock().unwrap().led_frame.clone()
    }

    pub fn led_closed(&self) -> bool {
        self.state.lock().unwrap().led_closed
    }

    /// Make every subsequent write to this servo channel fail.
    pub fn fail_servo(&self, channel: u8) {
        self.state.lock().unwrap().failing_servos.insert(channel);
    }

    /// Make every subsequent write to this motor fail.
    pub fn fail_motor(&self, index: u8) {
        self.state.lock().unwrap().failing_motors.insert(index);
    }

    /// Clear all injected faults.
    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_servos.clear();
        state.failing_motors.clear();
    }

    /// LED strip handle recording into this controller.
    pub fn led_strip(&self) -> SimulatedLedStrip {
        SimulatedLedStrip {
            state: self.state.clone(),
        }
    }
}

impl PwmController for SimulatedController {
    fn servo(&self, channel: u8) -> Result<Box<dyn ServoChannel>> {
        if channel > MAX_SERVO_CHANNEL {
            return Err(CoreError::InvalidServoChannel(channel));
        }
        Ok(Box::new(SimulatedServo {
            channel,
            state: self.state.clone(),
        }))
    }

    fn motor(&self, index: u8) -> Result<Box<dyn MotorChannel>> {
        if !(1..=2).contains(&index) {
            return Err(CoreError::InvalidMotorIndex(index));
        }
        Ok(Box::new(SimulatedMotor {
            index,
            state: self.state.clone(),
        }))
    }
}

struct SimulatedServo {
    channel: u8,
    state: Arc<Mutex<SimState>>,
}

impl ServoChannel for SimulatedServo {
    fn set_angle(&mut self, angle: u8) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_servos.contains(&self.channel) {
            return Err(CoreError::ActuatorWrite {
                actuator: format!("servo channel {}", self.channel),
                reason: "simulated fault".to_string(),
            });
        }
        trace!(target: "rasptank::servo", "sim servo {} -> {}", self.channel, angle);
        state.servo_angles.insert(self.channel, angle);
        *state.servo_writes.entry(self.channel).or_insert(0) += 1;
        Ok(())
    }
}

struct SimulatedMotor {
    index: u8,
    state: Arc<Mutex<SimState>>,
}

impl MotorChannel for SimulatedMotor {
    fn set_throttle(&mut self, throttle: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_motors.contains(&self.index) {
            return Err(CoreError::ActuatorWrite {
                actuator: format!("motor {}", self.index),
                reason: "simulated fault".to_string(),
            });
        }
        trace!(target: "rasptank::motor", "sim motor {} -> {:.2}", self.index, throttle);
        state.motor_throttles.insert(self.index, throttle);
        Ok(())
    }
}

/// LED strip recording frames into a [`SimulatedController`].
#[derive(Debug, Clone)]
pub struct SimulatedLedStrip {
    state: Arc<Mutex<SimState>>,
}

impl LedStrip for SimulatedLedStrip {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.led_frame = frame.to_vec();
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().led_closed = true;
    }
}
