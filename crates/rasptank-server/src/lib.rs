//! Rasptank server library - WebSocket control server for the robot.
//!
//! Routes, the session protocol and application state live here so that
//! integration tests can drive them without binding a socket.

pub mod config;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;
