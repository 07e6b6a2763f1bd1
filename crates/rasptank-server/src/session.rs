//! Session protocol: credential handshake, then one response per command message.

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::{StreamExt, stream};
use rasptank_core::CommandRouter;
use rasptank_types::{ACCEPTED_BANNER, Credentials, Envelope, REJECTED_BANNER};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A bidirectional text channel to one client.
pub trait Transport: Send {
    /// Next text payload, or `None` once the peer has closed.
    fn recv_text(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;

    fn send_text(&mut self, text: String) -> impl Future<Output = Result<()>> + Send;
}

impl Transport for WebSocket {
    async fn recv_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = WebSocket::recv(self).await {
            match message? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        warn!(target: "rasptank::ws", "Dropping non-UTF-8 binary frame ({} bytes)", bytes.len());
                    }
                },
                Message::Ping(_) | Message::Pong(_) => {
                    tracing::trace!(target: "rasptank::ws", "ping/pong");
                }
                Message::Close(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        WebSocket::send(self, Message::Text(text.into())).await?;
        Ok(())
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Closed,
}

/// Turns one authenticated message into its reply.
#[derive(Clone)]
pub struct MessageHandler {
    router: CommandRouter,
    batch_workers: usize,
}

impl MessageHandler {
    pub fn new(router: CommandRouter, batch_workers: usize) -> Self {
        Self {
            router,
            batch_workers: batch_workers.max(1),
        }
    }

    /// Reply text for one message, or `None` when it is ignored.
    ///
    /// Text that is not JSON is treated as a plain command line.
    pub async fn respond(&self, text: &str) -> Result<Option<String>> {
        let payload =
            serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()));

        let reply = match payload {
            Value::Null => return Ok(None),
            Value::String(line) if line.trim().is_empty() => return Ok(None),
            Value::String(line) => serde_json::to_string(&self.dispatch(line).await?)?,
            Value::Array(items) => serde_json::to_string(&self.dispatch_batch(items).await?)?,
            other => {
                debug!(target: "rasptank::session", "Unsupported payload type: {}", other);
                serde_json::to_string(&Envelope::unknown_payload(&other))?
            }
        };
        Ok(Some(reply))
    }

    async fn dispatch(&self, line: String) -> Result<Envelope> {
        let router = self.router.clone();
        Ok(tokio::task::spawn_blocking(move || router.dispatch(&line)).await??)
    }

    /// Dispatch every item concurrently, at most `batch_workers` at a time.
    /// Envelopes come back in submission order.
    async fn dispatch_batch(&self, items: Vec<Value>) -> Result<Vec<Envelope>> {
        debug!(target: "rasptank::session", "Batch of {} commands", items.len());
        let joined: Vec<_> = stream::iter(items)
            .map(|item| {
                let router = self.router.clone();
                let line = match item {
                    Value::String(line) => line,
                    other => other.to_string(),
                };
                tokio::task::spawn_blocking(move || router.dispatch(&line))
            })
            .buffered(self.batch_workers)
            .collect()
            .await;

        joined
            .into_iter()
            .map(|result| -> Result<Envelope> { Ok(result??) })
            .collect()
    }
}

/// One client connection speaking the command protocol.
pub struct Session<T> {
    id: Uuid,
    transport: T,
    handler: MessageHandler,
    credentials: Credentials,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, handler: MessageHandler, credentials: Credentials) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            handler,
            credentials,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session until the peer closes.
    ///
    /// Transport failures and actuator faults end the session with `Err`.
    pub async fn run(&mut self) -> Result<()> {
        info!(target: "rasptank::session", "[{}] Client connected", self.id);
        let result = self.serve().await;
        self.state = SessionState::Closed;
        match &result {
            Ok(()) => info!(target: "rasptank::session", "[{}] Client disconnected", self.id),
            Err(e) => warn!(target: "rasptank::session", "[{}] Session ended: {}", self.id, e),
        }
        result
    }

    async fn serve(&mut self) -> Result<()> {
        while let Some(text) = self.transport.recv_text().await? {
            match self.state {
                SessionState::Unauthenticated => self.authenticate(&text).await?,
                SessionState::Authenticated => {
                    debug!(target: "rasptank::session", "[{}] <- {}", self.id, text);
                    if let Some(reply) = self.handler.respond(&text).await? {
                        self.transport.send_text(reply).await?;
                    }
                }
                SessionState::Closed => break,
            }
        }
        Ok(())
    }

    async fn authenticate(&mut self, line: &str) -> Result<()> {
        let offered = Credentials::parse(line);
        if offered.matches(&self.credentials) {
            self.transport.send_text(ACCEPTED_BANNER.to_string()).await?;
            self.state = SessionState::Authenticated;
            info!(target: "rasptank::session", "[{}] Authenticated as '{}'", self.id, offered.username);
        } else {
            self.transport.send_text(REJECTED_BANNER.to_string()).await?;
            warn!(target: "rasptank::session", "[{}] Rejected credentials for '{}'", self.id, offered.username);
        }
        Ok(())
    }
}
