//! Numeric reply codes consumed by the client engine.
//!
//! Only the numerics the engine reacts to are named here; every other
//! numeric still flows through as a generic numeric reply.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>
//! - WATCH numerics: <https://github.com/grawity/irc-docs/blob/master/client/draft-meglio-irc-watch-00.txt>

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    // === Connection Registration ===
    /// 001 - Welcome; the first parameter is our accepted nick
    RPL_WELCOME = 1,
    /// 004 - Server name, version, user modes, channel modes
    RPL_MYINFO = 4,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,

    // === Command Replies ===
    /// 271 - One SILENCE list entry
    RPL_SILELIST = 271,
    /// 272 - End of SILENCE list
    RPL_ENDOFSILELIST = 272,
    /// 302 - USERHOST reply
    RPL_USERHOST = 302,
    /// 303 - ISON reply
    RPL_ISON = 303,
    /// 305 - No longer marked away
    RPL_UNAWAY = 305,
    /// 306 - Now marked away
    RPL_NOWAWAY = 306,
    /// 315 - End of WHO list
    RPL_ENDOFWHO = 315,
    /// 352 - WHO reply line
    RPL_WHOREPLY = 352,
    /// 375 - Start of MOTD
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 391 - Server local time
    RPL_TIME = 391,

    // === Error Replies ===
    /// 422 - MOTD file is missing
    ERR_NOMOTD = 422,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - Nickname collision
    ERR_NICKCOLLISION = 436,
    /// 437 - Nick/channel is temporarily unavailable
    ERR_UNAVAILRESOURCE = 437,
    /// 511 - SILENCE list is full
    ERR_SILELISTFULL = 511,
    /// 512 - WATCH list is full
    ERR_TOOMANYWATCH = 512,

    // === WATCH Extension ===
    /// 600 - Watched user logged on
    RPL_LOGON = 600,
    /// 601 - Watched user logged off
    RPL_LOGOFF = 601,
    /// 602 - Stopped watching
    RPL_WATCHOFF = 602,
    /// 603 - WATCH statistics
    RPL_WATCHSTAT = 603,
    /// 604 - Watched user is online
    RPL_NOWON = 604,
    /// 605 - Watched user is offline
    RPL_NOWOFF = 605,
    /// 606 - WATCH list entry
    RPL_WATCHLIST = 606,
    /// 607 - End of WATCH list
    RPL_ENDOFWATCHLIST = 607,
}

const ALL: &[Response] = &[
    Response::RPL_WELCOME,
    Response::RPL_MYINFO,
    Response::RPL_ISUPPORT,
    Response::RPL_SILELIST,
    Response::RPL_ENDOFSILELIST,
    Response::RPL_USERHOST,
    Response::RPL_ISON,
    Response::RPL_UNAWAY,
    Response::RPL_NOWAWAY,
    Response::RPL_ENDOFWHO,
    Response::RPL_WHOREPLY,
    Response::RPL_MOTDSTART,
    Response::RPL_ENDOFMOTD,
    Response::RPL_TIME,
    Response::ERR_NOMOTD,
    Response::ERR_NONICKNAMEGIVEN,
    Response::ERR_ERRONEUSNICKNAME,
    Response::ERR_NICKNAMEINUSE,
    Response::ERR_NICKCOLLISION,
    Response::ERR_UNAVAILRESOURCE,
    Response::ERR_SILELISTFULL,
    Response::ERR_TOOMANYWATCH,
    Response::RPL_LOGON,
    Response::RPL_LOGOFF,
    Response::RPL_WATCHOFF,
    Response::RPL_WATCHSTAT,
    Response::RPL_NOWON,
    Response::RPL_NOWOFF,
    Response::RPL_WATCHLIST,
    Response::RPL_ENDOFWATCHLIST,
];

impl Response {
    /// Returns the numeric code as u16
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Creates a Response from a numeric code
    pub fn from_code(code: u16) -> Option<Response> {
        ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Check if this is an error response
    #[inline]
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }

    /// True for replies that reject a requested nickname during registration.
    pub fn is_nick_rejection(&self) -> bool {
        matches!(
            self,
            Self::ERR_NICKNAMEINUSE
                | Self::ERR_ERRONEUSNICKNAME
                | Self::ERR_NICKCOLLISION
                | Self::ERR_UNAVAILRESOURCE
        )
    }

    /// True for replies of the WATCH extension.
    pub fn is_watch(&self) -> bool {
        (600..=607).contains(&self.code())
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u16 = s.parse().map_err(|_| ParseResponseError::InvalidFormat)?;
        Response::from_code(code).ok_or(ParseResponseError::UnknownCode(code))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Error when parsing a response code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseResponseError {
    /// The string was not a valid number
    #[error("invalid response code format")]
    InvalidFormat,
    /// The numeric code is not one the engine names
    #[error("unknown response code: {0}")]
    UnknownCode(u16),
}
