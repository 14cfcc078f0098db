//! CTCP (Client-to-Client Protocol) extraction.
//!
//! CTCP payloads ride inside PRIVMSG/NOTICE text, framed by `\x01`. The
//! command token ends at the first space or `\x01`; the optional payload runs
//! to the closing `\x01`, which some clients omit.
//!
//! # Reference
//! - CTCP specification: <https://modern.ircdocs.horse/ctcp.html>
//!
//! # Example
//!
//! ```
//! use slirc_proto::Ctcp;
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert!(ctcp.is_action());
//! assert_eq!(ctcp.payload, Some("waves hello"));
//!
//! assert_eq!(Ctcp::action("dances").to_string(), "\x01ACTION dances\x01");
//! ```

use std::fmt;

/// The CTCP delimiter byte.
pub const CTCP_DELIM: char = '\x01';

/// A CTCP command extracted from message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Command token as sent, e.g. `VERSION`.
    pub command: &'a str,
    /// Text after the command, without the closing delimiter.
    pub payload: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Extract CTCP framing from PRIVMSG/NOTICE text.
    ///
    /// Returns `None` unless the text starts with `\x01`.
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(CTCP_DELIM)?;
        let end = body.find([' ', CTCP_DELIM]).unwrap_or(body.len());
        let command = &body[..end];
        let rest = &body[end..];

        let payload = rest.strip_prefix(' ').map(|p| match p.find(CTCP_DELIM) {
            Some(close) => &p[..close],
            None => p,
        });

        Some(Self { command, payload })
    }

    /// True if this text is CTCP-framed.
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(CTCP_DELIM)
    }

    /// True only for a command literally equal to `ACTION`.
    pub fn is_action(&self) -> bool {
        self.command == "ACTION"
    }

    /// Build an `ACTION` (`/me`).
    pub fn action(text: &'a str) -> Self {
        Self {
            command: "ACTION",
            payload: Some(text),
        }
    }

    /// Build an arbitrary CTCP request or reply.
    pub fn new(command: &'a str, payload: Option<&'a str>) -> Self {
        Self { command, payload }
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            Some(payload) => write!(f, "{0}{1} {2}{0}", CTCP_DELIM, self.command, payload),
            None => write!(f, "{0}{1}{0}", CTCP_DELIM, self.command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let ctcp = Ctcp::parse("\x01ACTION waves\x01").unwrap();
        assert_eq!(ctcp.command, "ACTION");
        assert_eq!(ctcp.payload, Some("waves"));
        assert!(ctcp.is_action());
    }

    #[test]
    fn test_parse_without_payload() {
        let ctcp = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(ctcp.command, "VERSION");
        assert_eq!(ctcp.payload, None);
    }

    #[test]
    fn test_parse_unterminated() {
        let ctcp = Ctcp::parse("\x01PING 12345").unwrap();
        assert_eq!(ctcp.command, "PING");
        assert_eq!(ctcp.payload, Some("12345"));

        let ctcp = Ctcp::parse("\x01TIME").unwrap();
        assert_eq!(ctcp.command, "TIME");
        assert_eq!(ctcp.payload, None);
    }

    #[test]
    fn test_payload_keeps_inner_spaces() {
        let ctcp = Ctcp::parse("\x01ACTION does a  thing\x01").unwrap();
        assert_eq!(ctcp.payload, Some("does a  thing"));
    }

    #[test]
    fn test_action_is_case_sensitive() {
        let ctcp = Ctcp::parse("\x01action waves\x01").unwrap();
        assert!(!ctcp.is_action());
    }

    #[test]
    fn test_not_ctcp() {
        assert!(Ctcp::parse("hello").is_none());
        assert!(!Ctcp::is_ctcp("hello \x01"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Ctcp::new("PING", Some("123")).to_string(),
            "\x01PING 123\x01"
        );
        assert_eq!(Ctcp::new("VERSION", None).to_string(), "\x01VERSION\x01");
    }
}
