//! Shared application state.

use crate::config::Config;
use rasptank_core::{CommandRouter, Robot, SimulatedController, SystemTelemetry};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub robot: Arc<Robot>,
    pub router: CommandRouter,
    pub config: Config,
}

impl AppState {
    /// Build the robot on the simulated PWM backend with host telemetry.
    pub fn new(config: Config) -> rasptank_core::Result<Self> {
        let controller = SimulatedController::new();
        let robot = Robot::new(
            &controller,
            Box::new(controller.led_strip()),
            Arc::new(SystemTelemetry::default()),
            &config.robot,
        )?;
        Ok(Self::with_robot(config, Arc::new(robot)))
    }

    pub fn with_robot(config: Config, robot: Arc<Robot>) -> Self {
        let router = CommandRouter::new(robot.clone());
        Self {
            robot,
            router,
            config,
        }
    }
}
