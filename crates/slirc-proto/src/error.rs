//! Error types for the IRC wire layer.
//!
//! Framing failures on the byte stream are [`ProtocolError`]s and end the
//! connection. Failures to understand a single line are
//! [`MessageParseError`]s; callers downgrade them to an "unknown" event
//! instead of failing the stream.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Stream-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the payload budget. The server is misbehaving.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length, excluding the line terminator.
        actual: usize,
        /// Maximum allowed payload length.
        limit: usize,
    },

    /// Failed to parse an IRC line.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing a single IRC line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was missing or not `1*letter / 3digit`.
    #[error("invalid command")]
    InvalidCommand,

    /// A `:` prefix was not followed by a space before the end of the line.
    #[error("unterminated origin/prefix")]
    UnterminatedOrigin,

    /// Tags section was not followed by anything.
    #[error("unterminated tags section")]
    UnterminatedTags,

    /// A numeric reply arrived without the server prefix it requires.
    #[error("numeric {0} without prefix")]
    NumericWithoutPrefix(String),

    /// Not enough parameters for the command.
    #[error("not enough arguments for {command}: expected {expected}, got {got}")]
    NotEnoughArguments {
        /// Command name.
        command: String,
        /// Expected number of arguments.
        expected: usize,
        /// Actual number of arguments.
        got: usize,
    },

    /// Parsing error with position information.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

/// Errors encountered when interpreting a mode string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModeParseError {
    /// No mode string was given.
    #[error("empty mode string")]
    EmptyModeString,

    /// A mode that always takes a parameter had none left.
    #[error("mode {sign}{mode} requires a parameter")]
    MissingParameter {
        /// Sign in effect for the mode.
        sign: char,
        /// Mode letter.
        mode: char,
    },
}
