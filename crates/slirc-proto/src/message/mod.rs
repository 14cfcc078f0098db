//! Raw IRC lines: structural parsing and reserialization.
//!
//! A [`RawMessage`] is the owned `[@tags] [:prefix] COMMAND params...` view of
//! one line. It knows nothing about what the command means; classification
//! into typed events happens one layer up.

mod latin1;
mod nom_parser;

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

pub use self::latin1::{latin1_decode, latin1_encode};
use self::nom_parser::split_line;
use crate::error::MessageParseError;

/// One IRC line split into its structural parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    /// Raw IRCv3 tag section without the leading `@`, kept verbatim.
    pub tags: Option<String>,
    /// Source prefix without the leading `:`.
    pub prefix: Option<String>,
    /// Command name or three-digit numeric, as received.
    pub command: String,
    /// Parameters, with the trailing parameter's `:` removed.
    pub params: Vec<String>,
}

impl RawMessage {
    /// Build an outbound message with no prefix.
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: None,
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse one line. A trailing CR/LF is tolerated.
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let parts = split_line(line)?;
        Ok(Self {
            tags: parts.tags.map(str::to_string),
            prefix: parts.prefix.map(str::to_string),
            command: parts.command.to_string(),
            params: parts.params.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// True if the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.numeric().is_some()
    }

    /// The numeric reply code, if the command is one.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Uppercased command name, for dispatch.
    pub fn command_upper(&self) -> String {
        self.command.to_ascii_uppercase()
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, if any.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Check that at least `expected` parameters are present.
    pub fn require_params(&self, expected: usize) -> Result<(), MessageParseError> {
        if self.params.len() < expected {
            return Err(MessageParseError::NotEnoughArguments {
                command: self.command.clone(),
                expected,
                got: self.params.len(),
            });
        }
        Ok(())
    }
}

impl FromStr for RawMessage {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serializes without the CR/LF terminator; framing adds it.
///
/// The last parameter gets a `:` whenever it would otherwise not survive a
/// reparse: when it is empty, contains a space, or itself starts with `:`.
impl Display for RawMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref tags) = self.tags {
            write!(f, "@{} ", tags)?;
        }
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
