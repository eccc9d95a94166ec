//! Sala production server.
//!
//! Runs the [`ChatDriver`] from [`sala_core`] over real sockets.
//!
//! # Architecture
//!
//! One task, the event loop, owns the listener, the driver, and the table of
//! live connections. It waits on two sources at once: new connections from
//! the [`Listener`], and events from per-connection reader/writer tasks.
//! Every event goes through the driver and the resulting actions are
//! executed before the next event is taken, so chat state is only ever
//! touched by one task and needs no locks.
//!
//! ```text
//!            accept()                 ServerEvent (bounded mpsc)
//! Listener ───────────> event loop <──────────────────── reader tasks
//!                          │
//!                          │ ServerAction → encoded lines (bounded mpsc, try_send)
//!                          ▼
//!                     writer tasks ──> sockets
//! ```
//!
//! The loop never waits on a peer. A line that does not fit in a peer's
//! outbound queue marks that session as stalled, and the loop feeds a
//! [`ServerEvent::ConnectionClosed`] for it back through the driver, the
//! same teardown a read failure gets.
//!
//! # Components
//!
//! - [`Server`]: the event loop
//! - [`Listener`]: transport seam, implemented for tokio's `TcpListener`
//! - [`ServerRuntimeConfig`]: bind address, [`DriverConfig`] and
//!   [`ConnectionConfig`]

mod connection;
mod error;
mod transport;

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
};

use bytes::Bytes;
use connection::{ConnectionHandle, SendFailure};
pub use connection::ConnectionConfig;
pub use error::ServerError;
pub use sala_core::{
    ChatDriver, DriverConfig, DriverError, LogLevel, ServerAction, ServerEvent, SessionId,
};
use tokio::{net::TcpListener, sync::mpsc};
pub use transport::Listener;

/// Capacity of the channel from connection tasks to the event loop.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:7777")
    pub bind_address: String,
    /// Driver configuration (limits)
    pub driver: DriverConfig,
    /// Outbound queue and write limits
    pub connection: ConnectionConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7777".to_string(),
            driver: DriverConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

/// Production chat server.
///
/// Generic over the [`Listener`] so tests can substitute a simulated network.
pub struct Server<L: Listener = TcpListener> {
    /// The action-based chat driver
    driver: ChatDriver,
    listener: L,
    /// Live connections (`session_id` → handle)
    connections: HashMap<SessionId, ConnectionHandle>,
    connection_config: ConnectionConfig,
    /// Cloned into every connection task
    events_tx: mpsc::Sender<ServerEvent>,
    events_rx: mpsc::Receiver<ServerEvent>,
    next_session_id: SessionId,
}

impl Server<TcpListener> {
    /// Bind a TCP listener and create the server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Config(format!("cannot bind '{}': {e}", config.bind_address))
        })?;
        Ok(Self::with_listener(listener, config.driver).with_connection_config(config.connection))
    }
}

impl<L: Listener> Server<L> {
    /// Create a server over an already bound listener.
    pub fn with_listener(listener: L, config: DriverConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            driver: ChatDriver::new(config),
            listener,
            connections: HashMap::new(),
            connection_config: ConnectionConfig::default(),
            events_tx,
            events_rx,
            next_session_id: 1,
        }
    }

    /// Replace the default per-connection output limits.
    #[must_use]
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the event loop.
    ///
    /// Does not return under normal operation. Accept errors are logged and
    /// the loop keeps serving existing connections.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("Server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept(stream, peer),
                    Err(e) => tracing::warn!("Accept error: {}", e),
                },
                Some(event) = self.events_rx.recv() => self.dispatch(event),
            }
        }
    }

    fn accept(&mut self, stream: L::Stream, peer: SocketAddr) {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        tracing::debug!(session_id, %peer, "Accepted connection");
        let handle = connection::spawn(
            session_id,
            stream,
            peer,
            &self.connection_config,
            self.events_tx.clone(),
        );
        self.connections.insert(session_id, handle);

        self.dispatch(ServerEvent::ConnectionAccepted { session_id });
    }

    /// Run `event` through the driver, then tear down every session whose
    /// writer could not take its output.
    fn dispatch(&mut self, event: ServerEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let actions = match self.driver.process_event(event) {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::debug!("Dropped event: {}", e);
                    continue;
                },
            };

            // Teardown broadcasts LEFT, which may stall further members
            pending.extend(self.execute_actions(actions).into_iter().map(|session_id| {
                ServerEvent::ConnectionClosed { session_id, reason: "write stalled".to_string() }
            }));
        }
    }

    /// Execute driver actions in order. Returns the sessions that could not
    /// accept a line.
    fn execute_actions(&mut self, actions: Vec<ServerAction>) -> Vec<SessionId> {
        let mut stalled = Vec::new();

        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, reply } => {
                    self.deliver(session_id, reply.to_line(), &mut stalled);
                },

                ServerAction::BroadcastToRoom { room, recipients, reply } => {
                    let line = reply.to_line();
                    tracing::trace!(%room, recipients = recipients.len(), "Broadcast");
                    for session_id in recipients {
                        self.deliver(session_id, line.clone(), &mut stalled);
                    }
                },

                ServerAction::CloseConnection { session_id, reason } => {
                    if let Some(handle) = self.connections.remove(&session_id) {
                        let peer = handle.peer();
                        tracing::info!(session_id, %peer, "Closing connection: {}", reason);
                        handle.close();
                    }
                },

                ServerAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }

        stalled
    }

    /// Queue a line without waiting. Members whose connection is gone are
    /// skipped; members that cannot take the line are added to `stalled`.
    fn deliver(&self, session_id: SessionId, line: Bytes, stalled: &mut Vec<SessionId>) {
        let Some(handle) = self.connections.get(&session_id) else {
            tracing::warn!(session_id, "Delivery to closed session dropped");
            return;
        };

        match handle.send(line) {
            Ok(()) => {},
            Err(SendFailure::Stalled) => {
                if !stalled.contains(&session_id) {
                    tracing::warn!(session_id, "Outbound queue full, disconnecting");
                    stalled.push(session_id);
                }
            },
            // The writer reported its own failure when it stopped
            Err(SendFailure::WriterGone) => {
                tracing::debug!(session_id, "Writer stopped, line dropped");
            },
        }
    }
}
