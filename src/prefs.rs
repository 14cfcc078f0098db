//! Read-only preferences collaborator.
//!
//! The engine never owns user preferences; it asks through [`Preferences`]
//! whenever it needs a nick, a quit message, an identify command or an
//! encoding. [`crate::config::Config`] is the stock implementation.

use encoding_rs::{Encoding, UTF_8};
use slirc_proto::UserAddress;

use crate::context::ServerId;

/// What an encoding override is being looked up for.
#[derive(Clone, Copy, Debug)]
pub enum EncodingScope<'a> {
    /// The source (or, for outbound private messages, the target) of a message.
    Mask(&'a UserAddress),
    /// A channel name.
    Channel(&'a str),
    /// A whole server connection.
    Server(&'a ServerId),
}

/// Outcome of matching a server-reported hostname against preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconcile {
    /// Nothing to ask; carry on.
    Accept,
    /// The user must confirm before the connection counts as finished.
    Confirm,
}

/// External preferences consumed by the engine.
pub trait Preferences: Send + Sync {
    /// Nick to register with.
    fn default_nick(&self) -> String;

    /// Username (ident) sent in `USER`.
    fn username(&self) -> String;

    /// Realname sent in `USER`.
    fn realname(&self) -> String;

    /// Message sent with a graceful `QUIT`.
    fn quit_message(&self) -> String;

    /// Password sent as `PASS` before registration.
    fn server_password(&self, server: &ServerId) -> Option<String>;

    /// Full identify command line for `nick`, if one is configured.
    fn identify_command(&self, nick: &str) -> Option<String>;

    /// Fallback encoding when no override applies.
    fn default_encoding(&self) -> &'static Encoding {
        UTF_8
    }

    /// Encoding override for one scope.
    fn encoding_override(&self, scope: EncodingScope<'_>) -> Option<&'static Encoding>;

    /// Decide what to do with the hostname a server reports in RPL_MYINFO.
    fn reconcile_server(&self, server: &ServerId, host: &str, network: Option<&str>) -> Reconcile;

    /// Keep-alive ticks of silence before a probe is sent.
    fn keepalive_ticks(&self, server: &ServerId) -> u32;
}
