//! Typed protocol events.
//!
//! Every inbound line becomes exactly one [`ParsedMessage`]: a set of common
//! fields plus a [`MessageKind`] describing what the line means. Lines that
//! cannot be understood become [`MessageKind::Unknown`] and are delivered
//! like any other.

mod classify;
mod encoding;

use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use slirc_proto::{ModeDelta, Sign, UserAddress};

use crate::context::{RequestId, ServerId};

pub use classify::{Classified, Classifier};
pub use encoding::{EncodingResolver, decode_text, encode_text};

/// One classified inbound line.
#[derive(Clone, Debug)]
pub struct ParsedMessage {
    /// Connection the line arrived on.
    pub server: ServerId,
    /// Per-connection sequence number, strictly increasing in arrival order.
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    /// Line bytes as received, without CR/LF.
    pub raw: Vec<u8>,
    /// Sender, when the prefix names a user.
    pub source: Option<UserAddress>,
    /// Encoding the text fields were decoded with.
    pub encoding: &'static Encoding,
    /// Request this reply belongs to, for correlated command families.
    pub request: Option<RequestId>,
    /// Sender is ignored; consumers must not display this message.
    pub suppressed: bool,
    pub kind: MessageKind,
}

impl ParsedMessage {
    /// Nick of the sender, if the sender is a user.
    pub fn source_nick(&self) -> Option<&str> {
        self.source.as_ref().map(UserAddress::nick)
    }

    /// Numeric reply code, if this is a numeric reply.
    pub fn numeric(&self) -> Option<u16> {
        match self.kind {
            MessageKind::Numeric { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// What a line means.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageKind {
    ChannelMessage {
        channel: String,
        text: String,
    },
    /// NOTICE to a channel, possibly restricted to a `STATUSMSG` prefix
    /// such as `@#chan`.
    ChannelNotice {
        channel: String,
        status: Option<char>,
        text: String,
    },
    ChannelAction {
        channel: String,
        text: String,
    },
    ChannelCtcpRequest {
        channel: String,
        command: String,
        payload: Option<String>,
    },
    /// CTCP carried in a NOTICE to a channel.
    ChannelCtcpResponse {
        channel: String,
        command: String,
        payload: Option<String>,
    },
    UserMessage {
        target: String,
        text: String,
    },
    UserNotice {
        target: String,
        text: String,
    },
    UserAction {
        target: String,
        text: String,
    },
    UserCtcpRequest {
        target: String,
        command: String,
        payload: Option<String>,
    },
    /// CTCP carried in a NOTICE.
    UserCtcpResponse {
        target: String,
        command: String,
        payload: Option<String>,
    },
    ChannelModeChange {
        channel: String,
        changes: Vec<ModeDelta>,
    },
    UserModeChange {
        nick: String,
        changes: Vec<ModeDelta>,
    },
    Join {
        channel: String,
    },
    Part {
        channel: String,
        reason: Option<String>,
    },
    Kick {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    Topic {
        channel: String,
        topic: String,
    },
    Invite {
        nick: String,
        channel: String,
    },
    Nick {
        new_nick: String,
    },
    Quit {
        reason: Option<String>,
    },
    /// Server echo of our SILENCE list changing.
    Silence {
        sign: Sign,
        mask: String,
    },
    Ping {
        token: String,
    },
    Pong {
        token: Option<String>,
    },
    /// Server is closing the link.
    Error {
        message: String,
    },
    /// Numeric reply. `target` is the first parameter (normally our nick);
    /// `params` are the ones after it.
    Numeric {
        code: u16,
        target: String,
        params: Vec<String>,
    },
    Unknown {
        reason: String,
    },
}

impl MessageKind {
    /// Channel this event happened in, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::ChannelMessage { channel, .. }
            | Self::ChannelNotice { channel, .. }
            | Self::ChannelAction { channel, .. }
            | Self::ChannelCtcpRequest { channel, .. }
            | Self::ChannelCtcpResponse { channel, .. }
            | Self::ChannelModeChange { channel, .. }
            | Self::Join { channel }
            | Self::Part { channel, .. }
            | Self::Kick { channel, .. }
            | Self::Topic { channel, .. }
            | Self::Invite { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// True for lines a user can cause: messages, CTCP, invites and the
    /// channel and nick activity that carries the user's address. These
    /// are subject to ignore suppression.
    pub fn is_suppressible(&self) -> bool {
        matches!(
            self,
            Self::ChannelMessage { .. }
                | Self::ChannelNotice { .. }
                | Self::ChannelAction { .. }
                | Self::ChannelCtcpRequest { .. }
                | Self::ChannelCtcpResponse { .. }
                | Self::UserMessage { .. }
                | Self::UserNotice { .. }
                | Self::UserAction { .. }
                | Self::UserCtcpRequest { .. }
                | Self::UserCtcpResponse { .. }
                | Self::Invite { .. }
                | Self::ChannelModeChange { .. }
                | Self::Join { .. }
                | Self::Part { .. }
                | Self::Kick { .. }
                | Self::Topic { .. }
                | Self::Nick { .. }
                | Self::Quit { .. }
        )
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChannelMessage { .. } => "channel_message",
            Self::ChannelNotice { .. } => "channel_notice",
            Self::ChannelAction { .. } => "channel_action",
            Self::ChannelCtcpRequest { .. } => "channel_ctcp_request",
            Self::ChannelCtcpResponse { .. } => "channel_ctcp_response",
            Self::UserMessage { .. } => "user_message",
            Self::UserNotice { .. } => "user_notice",
            Self::UserAction { .. } => "user_action",
            Self::UserCtcpRequest { .. } => "user_ctcp_request",
            Self::UserCtcpResponse { .. } => "user_ctcp_response",
            Self::ChannelModeChange { .. } => "channel_mode",
            Self::UserModeChange { .. } => "user_mode",
            Self::Join { .. } => "join",
            Self::Part { .. } => "part",
            Self::Kick { .. } => "kick",
            Self::Topic { .. } => "topic",
            Self::Invite { .. } => "invite",
            Self::Nick { .. } => "nick",
            Self::Quit { .. } => "quit",
            Self::Silence { .. } => "silence",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
            Self::Numeric { .. } => "numeric",
            Self::Unknown { .. } => "unknown",
        }
    }
}
