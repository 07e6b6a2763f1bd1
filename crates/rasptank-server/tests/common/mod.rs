//! Shared fixtures: a simulated robot and an in-memory transport.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use rasptank_core::{
    CommandRouter, FixedTelemetry, MotionProfile, Robot, RobotConfig, SimulatedController,
    SystemInfo,
};
use rasptank_server::config::Config;
use rasptank_server::session::{MessageHandler, Session, SessionState, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Robot on the simulated backend with fast servos and fixed telemetry.
pub fn simulated_robot() -> (Arc<Robot>, SimulatedController) {
    let sim = SimulatedController::new();
    let config = RobotConfig {
        motion: MotionProfile {
            step_period_ms: 1,
            degrees_per_second: 1000.0,
            ..MotionProfile::default()
        },
        ..RobotConfig::default()
    };
    let telemetry = Arc::new(FixedTelemetry(SystemInfo {
        cpu_temp: "47.1".into(),
        cpu_percent: "8.0".into(),
        ram_percent: "21.5".into(),
    }));
    let robot = Robot::new(&sim, Box::new(sim.led_strip()), telemetry, &config)
        .expect("simulated robot");
    (Arc::new(robot), sim)
}

/// Server side of an in-memory connection.
pub struct ChannelTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

impl Transport for ChannelTransport {
    async fn recv_text(&mut self) -> Result<Option<String>> {
        Ok(self.incoming.recv().await)
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outgoing
            .send(text)
            .map_err(|_| anyhow!("client went away"))
    }
}

/// Client side of an in-memory connection.
pub struct TestClient {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    pub fn send(&self, text: &str) {
        self.tx
            .as_ref()
            .expect("client already disconnected")
            .send(text.to_string())
            .expect("session stopped reading");
    }

    /// Next reply, or `None` once the session has dropped its end.
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(REPLY_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for a reply")
    }

    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = self.recv().await.expect("session closed");
        serde_json::from_str(&text).expect("reply is not JSON")
    }

    pub async fn login(&mut self) {
        self.send("admin:123456");
        let banner = self.recv().await.expect("session closed");
        assert!(banner.contains("congratulation"), "unexpected banner: {}", banner);
    }

    pub fn disconnect(&mut self) {
        self.tx = None;
    }
}

pub struct TestSession {
    pub client: TestClient,
    pub robot: Arc<Robot>,
    pub sim: SimulatedController,
    pub task: JoinHandle<(Result<()>, SessionState)>,
}

/// Start a session over an in-memory transport with default credentials.
pub fn start_session() -> TestSession {
    start_session_with(Config::default())
}

pub fn start_session_with(config: Config) -> TestSession {
    let (robot, sim) = simulated_robot();
    let (client_tx, incoming) = mpsc::unbounded_channel();
    let (outgoing, client_rx) = mpsc::unbounded_channel();

    let handler = MessageHandler::new(CommandRouter::new(robot.clone()), config.batch_workers);
    let transport = ChannelTransport { incoming, outgoing };
    let mut session = Session::new(transport, handler, config.credentials());
    let task = tokio::spawn(async move {
        let result = session.run().await;
        (result, session.state())
    });

    TestSession {
        client: TestClient {
            tx: Some(client_tx),
            rx: client_rx,
        },
        robot,
        sim,
        task,
    }
}
