//! Closed command vocabulary understood by the control server.

use serde::{Deserialize, Serialize};

/// Commands that take no argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    // Drive
    Forward,
    Backward,
    Left,
    Right,
    /// `DS`: stop after a drive command
    DriveStop,
    /// `TS`: stop after a turn command
    TurnStop,
    // Arm
    ArmUp,
    ArmDown,
    ArmStop,
    // Hand
    HandUp,
    HandDown,
    HandStop,
    // Wrist
    LookLeft,
    LookRight,
    WristStop,
    // Claw
    Grab,
    Loose,
    ClawStop,
    // Camera
    CameraUp,
    CameraDown,
    CameraStop,
    /// Reset every servo to its initial angle.
    Home,
    GetInfo,
}

impl Command {
    pub const ALL: [Command; 23] = [
        Command::Forward,
        Command::Backward,
        Command::Left,
        Command::Right,
        Command::DriveStop,
        Command::TurnStop,
        Command::ArmUp,
        Command::ArmDown,
        Command::ArmStop,
        Command::HandUp,
        Command::HandDown,
        Command::HandStop,
        Command::LookLeft,
        Command::LookRight,
        Command::WristStop,
        Command::Grab,
        Command::Loose,
        Command::ClawStop,
        Command::CameraUp,
        Command::CameraDown,
        Command::CameraStop,
        Command::Home,
        Command::GetInfo,
    ];

    /// Wire token for this command.
    pub fn name(self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::Left => "left",
            Command::Right => "right",
            Command::DriveStop => "DS",
            Command::TurnStop => "TS",
            Command::ArmUp => "armUp",
            Command::ArmDown => "armDown",
            Command::ArmStop => "armStop",
            Command::HandUp => "handUp",
            Command::HandDown => "handDown",
            Command::HandStop => "handStop",
            Command::LookLeft => "lookleft",
            Command::LookRight => "lookright",
            Command::WristStop => "LRstop",
            Command::Grab => "grab",
            Command::Loose => "loose",
            Command::ClawStop => "GLstop",
            Command::CameraUp => "up",
            Command::CameraDown => "down",
            Command::CameraStop => "UDstop",
            Command::Home => "home",
            Command::GetInfo => "get_info",
        }
    }

    /// Look up a wire token. Tokens are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

/// Commands that require one integer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgCommand {
    /// `wsB <percent>`: set the drive speed
    SetSpeed,
}

impl ArgCommand {
    pub const ALL: [ArgCommand; 1] = [ArgCommand::SetSpeed];

    pub fn name(self) -> &'static str {
        match self {
            ArgCommand::SetSpeed => "wsB",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

/// A command line split into its name and optional integer argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub name: &'a str,
    pub argument: Option<i64>,
}

impl<'a> CommandLine<'a> {
    /// Tokenize on whitespace. A second token that is not an integer is
    /// treated as absent; further tokens are ignored. Integers too large for
    /// `i64` saturate so callers can still clamp them.
    pub fn parse(text: &'a str) -> Self {
        let mut tokens = text.split_whitespace();
        let name = tokens.next().unwrap_or("");
        let argument = tokens.next().and_then(parse_saturating);
        Self { name, argument }
    }
}

fn parse_saturating(token: &str) -> Option<i64> {
    if let Ok(value) = token.parse::<i64>() {
        return Some(value);
    }
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}
