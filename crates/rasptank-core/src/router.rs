//! Maps command lines onto actuator calls.

use crate::Result;
use crate::robot::{Robot, ServoRole};
use rasptank_types::{ArgCommand, Command, CommandLine, Envelope};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatches one command line to the robot and wraps the outcome in an [`Envelope`].
///
/// Cheap to clone; clones share the same robot.
#[derive(Clone)]
pub struct CommandRouter {
    robot: Arc<Robot>,
}

impl CommandRouter {
    pub fn new(robot: Arc<Robot>) -> Self {
        Self { robot }
    }

    pub fn robot(&self) -> &Arc<Robot> {
        &self.robot
    }

    /// Run one command line.
    ///
    /// Unknown commands and missing arguments come back as `nok` envelopes.
    /// `Err` means an actuator write failed.
    pub fn dispatch(&self, text: &str) -> Result<Envelope> {
        let line = CommandLine::parse(text);
        let name = line.name;

        if let Some(command) = Command::from_name(name) {
            return self.run(command);
        }

        if let Some(command) = ArgCommand::from_name(name) {
            return match line.argument {
                Some(value) => {
                    self.run_with_argument(command, value);
                    Ok(Envelope::executed(name))
                }
                None => Ok(Envelope::missing_argument(name)),
            };
        }

        debug!(target: "rasptank::router", "Unsupported command '{}'", name);
        Ok(Envelope::not_supported(name))
    }

    fn run(&self, command: Command) -> Result<Envelope> {
        let robot = self.robot.as_ref();
        let movement = robot.movement();
        let servo = |role: ServoRole| robot.servo(role);

        debug!(target: "rasptank::router", "Executing {}", command.name());
        match command {
            Command::Forward => movement.forward()?,
            Command::Backward => movement.backward()?,
            Command::Left => movement.left()?,
            Command::Right => movement.right()?,
            Command::DriveStop | Command::TurnStop => movement.stop()?,
            Command::ArmUp => servo(ServoRole::Arm).clockwise(),
            Command::ArmDown => servo(ServoRole::Arm).anticlockwise(),
            Command::ArmStop => servo(ServoRole::Arm).stop()?,
            Command::HandUp => servo(ServoRole::Hand).clockwise(),
            Command::HandDown => servo(ServoRole::Hand).anticlockwise(),
            Command::HandStop => servo(ServoRole::Hand).stop()?,
            Command::LookLeft => servo(ServoRole::Wrist).clockwise(),
            Command::LookRight => servo(ServoRole::Wrist).anticlockwise(),
            Command::WristStop => servo(ServoRole::Wrist).stop()?,
            Command::Grab => servo(ServoRole::Claw).clockwise(),
            Command::Loose => servo(ServoRole::Claw).anticlockwise(),
            Command::ClawStop => servo(ServoRole::Claw).stop()?,
            Command::CameraUp => servo(ServoRole::Camera).clockwise(),
            Command::CameraDown => servo(ServoRole::Camera).anticlockwise(),
            Command::CameraStop => servo(ServoRole::Camera).stop()?,
            Command::Home => robot.home()?,
            Command::GetInfo => return Ok(self.system_info()),
        }
        Ok(Envelope::executed(command.name()))
    }

    fn run_with_argument(&self, command: ArgCommand, value: i64) {
        debug!(target: "rasptank::router", "Executing {} {}", command.name(), value);
        match command {
            ArgCommand::SetSpeed => {
                self.robot.movement().set_speed(value);
            }
        }
    }

    // Telemetry failures are reported to the client, not raised.
    fn system_info(&self) -> Envelope {
        let name = Command::GetInfo.name();
        match self.robot.system_info() {
            Ok(info) => Envelope::ok(name, info.to_list()),
            Err(e) => {
                warn!(target: "rasptank::telemetry", "get_info failed: {}", e);
                Envelope::nok(name, format!("Command {} Failed: {}", name, e))
            }
        }
    }
}
