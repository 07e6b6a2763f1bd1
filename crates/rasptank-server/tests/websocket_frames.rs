//! Session protocol over a real WebSocket connection.

mod common;

use axum::{
    Router,
    extract::ws::{WebSocket, WebSocketUpgrade},
    routing::get,
};
use common::simulated_robot;
use futures::{SinkExt, StreamExt};
use rasptank_core::CommandRouter;
use rasptank_server::config::Config;
use rasptank_server::session::{MessageHandler, Session, SessionState};
use rasptank_server::{routes, state::AppState};
use rasptank_types::ACCEPTED_BANNER;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Next text frame, skipping control frames.
async fn next_text(client: &mut Client) -> String {
    loop {
        let message = tokio::time::timeout(REPLY_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a reply")
            .expect("connection closed")
            .unwrap();
        match message {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn next_json(client: &mut Client) -> serde_json::Value {
    serde_json::from_str(&next_text(client).await).expect("reply is not JSON")
}

async fn login(client: &mut Client) {
    client.send(Message::text("admin:123456")).await.unwrap();
    assert_eq!(next_text(client).await, ACCEPTED_BANNER);
}

#[tokio::test]
async fn test_binary_and_ping_frames_are_handled() {
    let (robot, sim) = simulated_robot();
    let state = Arc::new(AppState::with_robot(Config::default(), robot));
    let mut client = connect(serve(routes::app(state)).await).await;
    login(&mut client).await;

    client.send(Message::binary(b"DS".to_vec())).await.unwrap();
    let reply = next_json(&mut client).await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["title"], "DS");

    // ping and invalid UTF-8 produce no reply of their own
    client.send(Message::Ping(b"alive".to_vec().into())).await.unwrap();
    client.send(Message::binary(vec![0xff, 0xfe, 0xfd])).await.unwrap();
    client.send(Message::text("backward")).await.unwrap();
    let reply = next_json(&mut client).await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["title"], "backward");
    assert_eq!(sim.motor_throttle(1), Some(1.0));
}

#[tokio::test]
async fn test_close_frame_ends_session_cleanly() {
    let (robot, _sim) = simulated_robot();
    let router = CommandRouter::new(robot);
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();

    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let router = router.clone();
            let report_tx = report_tx.clone();
            async move {
                ws.on_upgrade(move |socket: WebSocket| async move {
                    let handler = MessageHandler::new(router, 2);
                    let credentials = Config::default().credentials();
                    let mut session = Session::new(socket, handler, credentials);
                    let result = session.run().await;
                    let _ = report_tx.send((result.is_ok(), session.state()));
                })
            }
        }),
    );

    let mut client = connect(serve(app).await).await;
    login(&mut client).await;
    client.close(None).await.unwrap();

    let (ok, state) = tokio::time::timeout(REPLY_TIMEOUT, report_rx.recv())
        .await
        .expect("session did not finish")
        .expect("session task dropped its report");
    assert!(ok);
    assert_eq!(state, SessionState::Closed);
}
