//! Cloneable handle to a running connection.

use std::sync::Arc;

use slirc_proto::{Ctcp, ProtocolError, RawMessage, UserAddress};
use tokio::sync::mpsc;
use tracing::debug;

use super::connection::ConnCommand;
use crate::context::{RequestId, RequestIds, ServerId};
use crate::engine::Command;
use crate::error::{ClientError, ClientResult};
use crate::presence::PresenceOp;
use crate::telemetry::spans;

/// Every method fails with [`ClientError::SessionClosed`] once the
/// connection has ended.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    server: ServerId,
    tx: mpsc::UnboundedSender<ConnCommand>,
    requests: Arc<RequestIds>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        server: ServerId,
        tx: mpsc::UnboundedSender<ConnCommand>,
        requests: Arc<RequestIds>,
    ) -> Self {
        Self {
            server,
            tx,
            requests,
        }
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    fn post(&self, command: ConnCommand) -> ClientResult<()> {
        self.tx.send(command).map_err(|_| ClientError::SessionClosed)
    }

    fn engine(&self, command: Command) -> ClientResult<()> {
        self.post(ConnCommand::Engine(command))
    }

    /// Send a message through flood control.
    pub fn send(&self, msg: RawMessage) -> ClientResult<()> {
        let _span = spans::command(&msg.command, msg.param(0)).entered();
        debug!(server = %self.server, "queueing command");
        self.engine(Command::Send(msg))
    }

    /// Send a raw line such as `MODE #chan +m`.
    pub fn send_raw(&self, line: &str) -> ClientResult<()> {
        let msg = RawMessage::parse(line).map_err(|cause| {
            ClientError::Protocol(ProtocolError::InvalidMessage {
                string: line.to_string(),
                cause,
            })
        })?;
        self.send(msg)
    }

    pub fn privmsg(&self, target: &str, text: &str) -> ClientResult<()> {
        self.send(RawMessage::new("PRIVMSG", [target, text]))
    }

    pub fn notice(&self, target: &str, text: &str) -> ClientResult<()> {
        self.send(RawMessage::new("NOTICE", [target, text]))
    }

    /// `/me`.
    pub fn action(&self, target: &str, text: &str) -> ClientResult<()> {
        self.privmsg(target, &Ctcp::action(text).to_string())
    }

    /// CTCP request, e.g. `VERSION`.
    pub fn ctcp(&self, target: &str, command: &str, payload: Option<&str>) -> ClientResult<()> {
        self.privmsg(target, &Ctcp::new(command, payload).to_string())
    }

    pub fn join(&self, channel: &str, key: Option<&str>) -> ClientResult<()> {
        match key {
            Some(key) => self.send(RawMessage::new("JOIN", [channel, key])),
            None => self.send(RawMessage::new("JOIN", [channel])),
        }
    }

    pub fn part(&self, channel: &str, reason: Option<&str>) -> ClientResult<()> {
        match reason {
            Some(reason) => self.send(RawMessage::new("PART", [channel, reason])),
            None => self.send(RawMessage::new("PART", [channel])),
        }
    }

    /// WHO; every reply up to RPL_ENDOFWHO carries the returned id.
    pub fn who(&self, mask: &str) -> ClientResult<RequestId> {
        let id = self.requests.allocate();
        self.engine(Command::Who {
            mask: mask.to_string(),
            id,
        })?;
        Ok(id)
    }

    /// Mark away with a message, or back with `None`. Session state only
    /// changes once the server confirms.
    pub fn away(&self, message: Option<&str>) -> ClientResult<()> {
        match message {
            Some(text) => self.send(RawMessage::new("AWAY", [text])),
            None => self.send(RawMessage::new("AWAY", Vec::<String>::new())),
        }
    }

    /// Ban `nick`'s host from `channel` (looked up with USERHOST).
    pub fn ban(&self, channel: &str, nick: &str) -> ClientResult<()> {
        self.engine(Command::Ban {
            channel: channel.to_string(),
            nick: nick.to_string(),
        })
    }

    /// Watch a mask for as long as it is referenced (e.g. displayed).
    pub fn watch_temporary(&self, mask: &str) -> ClientResult<()> {
        self.presence(PresenceOp::AddTemporary(UserAddress::parse(mask)))
    }

    pub fn unwatch_temporary(&self, mask: &str) -> ClientResult<()> {
        self.presence(PresenceOp::RemoveTemporary(UserAddress::parse(mask)))
    }

    pub(crate) fn presence(&self, op: PresenceOp) -> ClientResult<()> {
        self.engine(Command::Presence(op))
    }

    pub(crate) fn unignored(&self, mask: UserAddress) -> ClientResult<()> {
        self.engine(Command::Unignored(mask))
    }

    pub(crate) fn presence_tick(&self) -> ClientResult<()> {
        self.post(ConnCommand::PresenceTick)
    }

    /// Let a connection waiting on server confirmation finish.
    pub fn confirm_server(&self) -> ClientResult<()> {
        self.engine(Command::ConfirmServer)
    }

    /// Graceful disconnect: QUIT, then close. `None` uses the configured
    /// quit message.
    pub fn quit(&self, message: Option<&str>) -> ClientResult<()> {
        self.engine(Command::Quit(message.map(str::to_string)))
    }

    /// Forced disconnect.
    pub fn close(&self) -> ClientResult<()> {
        self.post(ConnCommand::Close)
    }
}
