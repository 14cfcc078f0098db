//! Per-connection session state and the registration/keep-alive machine.

mod machine;
pub mod nick;

use slirc_proto::{ISupportTable, RawMessage};
use tokio::time::Instant;

use crate::bus::ConnectionEvent;
use crate::context::ServerId;
use crate::error::ClientError;

pub use machine::SessionMachine;

/// Lifecycle of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    /// Registration burst sent, waiting for RPL_WELCOME.
    Registering,
    Active {
        motd_done: bool,
    },
    Finished,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Connecting | Self::Disconnected)
    }
}

/// Side effects requested by the [`SessionMachine`].
#[derive(Debug)]
pub enum Action {
    /// Send through flood control.
    Send(RawMessage),
    /// Send ahead of any flood backlog.
    SendNow(RawMessage),
    Connection(ConnectionEvent),
    Away(bool),
    /// Close the connection. `None` means we asked for it.
    Close(Option<ClientError>),
}

/// Mutable state of one connection attempt. A fresh session is created for
/// every attempt; nothing but preferences carries over.
#[derive(Debug)]
pub struct ServerSession {
    pub server: ServerId,
    /// Nick we hold, or the one we are currently trying to register.
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
    /// Host name the server reported in RPL_MYINFO.
    pub server_host: Option<String>,
    pub isupport: ISupportTable,
    pub state: ConnectionState,
    pub nick_accepted: bool,
    pub motd_seen: bool,
    pub identified: bool,
    pub away: bool,
    pub confirmation_pending: bool,
    pub quit_requested: bool,
    pub last_line: Instant,
    pub idle_ticks: u32,
    pub nick_attempts: u32,
    /// First rejected nick, without trailing underscores.
    pub nick_base: Option<String>,
}

impl ServerSession {
    pub fn new(server: ServerId, nick: impl Into<String>, now: Instant) -> Self {
        Self {
            server,
            nick: nick.into(),
            user: None,
            host: None,
            server_host: None,
            isupport: ISupportTable::new(),
            state: ConnectionState::Connecting,
            nick_accepted: false,
            motd_seen: false,
            identified: false,
            away: false,
            confirmation_pending: false,
            quit_requested: false,
            last_line: now,
            idle_ticks: 0,
            nick_attempts: 0,
            nick_base: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == ConnectionState::Finished
    }
}
