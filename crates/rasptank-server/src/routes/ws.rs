//! WebSocket route handler.

use crate::session::{MessageHandler, Session};
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use std::sync::Arc;

pub async fn upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let handler = MessageHandler::new(state.router.clone(), state.config.batch_workers);
    let mut session = Session::new(socket, handler, state.config.credentials());
    if let Err(e) = session.run().await {
        tracing::error!(target: "rasptank::ws", "WebSocket error for session {}: {}", session.id(), e);
    }
}
