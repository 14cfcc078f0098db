//! # slirc-proto
//!
//! The wire layer of the slirc client engine: everything needed to turn one
//! line of bytes from an IRC server into structured data, without holding
//! any connection state.
//!
//! ## Features
//!
//! - Byte-level line framing with the 510-byte payload budget
//! - Raw line parsing (prefix / command / params) and lossless reserialization
//! - `nick!user@host` masks with wildcard matching and casemapping
//! - Incremental ISUPPORT (RPL_ISUPPORT / 005) table with documented defaults
//! - CTCP extraction and table-driven channel mode parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_proto::{RawMessage, UserAddress};
//!
//! let raw: RawMessage = ":nick!user@host PRIVMSG #chan :hello".parse().unwrap();
//! assert_eq!(raw.command, "PRIVMSG");
//! assert_eq!(raw.params, vec!["#chan", "hello"]);
//!
//! let ban = UserAddress::parse("*!*@host");
//! assert!(ban.matches(&UserAddress::parse("nick!user@host")));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod ctcp;
pub mod error;
pub mod format;
pub mod isupport;
#[cfg(feature = "tokio")]
pub mod line;
pub mod mask;
pub mod message;
pub mod mode;
pub mod response;

pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
pub use self::ctcp::Ctcp;
pub use self::error::{MessageParseError, ModeParseError, ProtocolError};
pub use self::format::strip_formatting;
pub use self::isupport::{ChanModes, ISupportTable, ModeClass, PrefixSpec};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, MAX_LINE_PAYLOAD};
pub use self::mask::{wildcard_match, UserAddress};
pub use self::message::{latin1_decode, latin1_encode, RawMessage};
pub use self::mode::{parse_channel_modes, parse_user_modes, ModeDelta, Sign};
pub use self::response::{ParseResponseError, Response};
