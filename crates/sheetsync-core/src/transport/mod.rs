//! Transports
//!
//! A transport is the only thing between the sync client and an authoritative
//! backend. Intents go in through [`Transport::send_intent`]; everything the
//! backend says comes back as [`ServerEvent`]s on the receivers handed out by
//! [`Transport::subscribe`]. Failures after `connect` are reported as events,
//! never as panics.

mod simulated;
mod socket;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use simulated::SimulatedBackend;
pub use socket::SocketTransport;

use crate::config::{Config, TransportMode};
use crate::sync::{Intent, ServerEvent};

/// Errors surfaced directly by transport calls
#[derive(Error, Debug)]
pub enum TransportError {
    /// The WebSocket handshake failed
    #[error("Failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// The transport has no open connection
    #[error("Transport is not connected")]
    NotConnected,

    /// A frame could not be handed to the writer
    #[error("Failed to send: {0}")]
    Send(String),
}

/// Bidirectional channel to a backend
#[async_trait]
pub trait Transport: Send {
    fn mode(&self) -> TransportMode;

    /// Open the channel. Resolves once the backend is reachable.
    async fn connect(&mut self) -> Result<(), TransportError>;

    fn disconnect(&mut self);

    /// Fire-and-forget; the outcome arrives later as events
    fn send_intent(&mut self, intent: Intent);

    /// Register a new event listener. Dropping the receiver unsubscribes.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ServerEvent>;
}

/// Build the transport selected by the configuration
pub fn from_config(config: &Config) -> Box<dyn Transport> {
    match config.transport {
        TransportMode::Simulated => {
            Box::new(SimulatedBackend::new().with_latency(config.simulated_latency()))
        }
        TransportMode::Socket => Box::new(SocketTransport::new(config.socket_url.clone())),
    }
}

/// Fan-out of events to every live subscriber, in emission order
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ServerEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver an event to every subscriber, pruning closed ones
    pub fn emit(&self, event: ServerEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ServerEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
