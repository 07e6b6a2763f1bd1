//! Seams between the control logic and the physical board.
//!
//! Register-level drivers live behind these traits. The crate ships the
//! in-memory [`SimulatedController`](crate::SimulatedController) only.

use crate::Result;

/// One PWM servo output.
pub trait ServoChannel: Send {
    /// Command an absolute angle in whole degrees.
    fn set_angle(&mut self, angle: u8) -> Result<()>;
}

/// One DC motor on an H-bridge pair of PWM outputs.
pub trait MotorChannel: Send {
    /// Throttle in `[-1.0, 1.0]`; `0.0` stops the motor.
    fn set_throttle(&mut self, throttle: f64) -> Result<()>;
}

/// Factory for servo and motor handles on a PWM board.
pub trait PwmController: Send + Sync {
    fn servo(&self, channel: u8) -> Result<Box<dyn ServoChannel>>;
    fn motor(&self, index: u8) -> Result<Box<dyn MotorChannel>>;
}

/// Addressable LED strip transport.
pub trait LedStrip: Send {
    /// Push one frame of colour bytes, three per LED, already in wire order.
    fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Release the underlying bus.
    fn close(&mut self) {}
}
