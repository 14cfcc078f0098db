//! Event bus.
//!
//! Every connection publishes into one broadcast channel: one
//! [`ClientEvent::Message`] per inbound line in arrival order, followed by
//! any events derived from that line.

use std::sync::Arc;

use slirc_proto::UserAddress;
use tokio::sync::broadcast;

use crate::context::ServerId;
use crate::error::ClientError;
use crate::event::ParsedMessage;

const DEFAULT_CAPACITY: usize = 1024;

/// Connection lifecycle transitions.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    Connecting,
    /// Socket is up; the registration burst has been sent.
    Connected,
    /// The server accepted our nick (RPL_WELCOME).
    Registered { nick: String },
    /// RPL_MYINFO named the server.
    ServerIdentified {
        host: String,
        network: Option<String>,
    },
    /// The finished signal waits for [`crate::ConnectionHandle::confirm_server`].
    ConfirmationRequested { host: String },
    Finished,
    /// Sent exactly once per connection. `None` means the user asked for it.
    Disconnected { cause: Option<Arc<ClientError>> },
}

impl ConnectionEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Everything the engine tells its consumers.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    Message(Arc<ParsedMessage>),
    Connection {
        server: ServerId,
        event: ConnectionEvent,
    },
    /// A watched mask changed state.
    Presence {
        server: ServerId,
        mask: UserAddress,
        nick: String,
        online: bool,
    },
    /// Server-confirmed away state changed.
    AwayChanged { server: ServerId, away: bool },
    IgnoreListChanged,
    WatchListChanged,
}

impl ClientEvent {
    pub fn server(&self) -> Option<&ServerId> {
        match self {
            Self::Message(msg) => Some(&msg.server),
            Self::Connection { server, .. }
            | Self::Presence { server, .. }
            | Self::AwayChanged { server, .. } => Some(server),
            Self::IgnoreListChanged | Self::WatchListChanged => None,
        }
    }
}

/// Broadcast fan-out of [`ClientEvent`]s.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }
}
