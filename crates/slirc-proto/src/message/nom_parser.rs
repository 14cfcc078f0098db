//! Nom-based line splitter.
//!
//! Splits one line into its structural parts without allocating. Parts
//! borrow from the input; [`super::RawMessage`] owns them afterwards.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// Most parameters a line may carry.
pub(crate) const MAX_PARAMS: usize = 15;

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_until(" "))(input)
}

/// command = 1*letter / 3digit
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_alphanumeric())(input)?;

    let is_all_letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());

    if is_all_letters || is_three_digits {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Split parameters. Runs of spaces separate parameters; a `:` starts the
/// trailing parameter, and the fifteenth parameter always runs to the end.
fn parse_params(input: &str) -> (&str, SmallVec<[&str; MAX_PARAMS]>) {
    let mut params: SmallVec<[&str; MAX_PARAMS]> = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            rest = "";
            break;
        }

        if params.len() == MAX_PARAMS - 1 {
            params.push(rest);
            rest = "";
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    (rest, params)
}

/// Structural parts of one line, borrowed from the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineParts<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

/// Split a line (without CR/LF) into tags, prefix, command and params.
pub(crate) fn split_line(input: &str) -> Result<LineParts<'_>, MessageParseError> {
    let line = input.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let (rest, tags) = opt(parse_tags)(line).map_err(|_| MessageParseError::UnterminatedTags)?;
    if line.starts_with('@') && tags.is_none() {
        return Err(MessageParseError::UnterminatedTags);
    }
    let (rest, _) = space0::<_, nom::error::Error<&str>>(rest).map_err(|_| context(line, rest))?;

    let (rest, prefix) =
        opt(parse_prefix)(rest).map_err(|_| MessageParseError::UnterminatedOrigin)?;
    if prefix.is_none() && rest.starts_with(':') {
        return Err(MessageParseError::UnterminatedOrigin);
    }
    let (rest, _) = space0::<_, nom::error::Error<&str>>(rest).map_err(|_| context(line, rest))?;

    let (rest, command) = parse_command(rest).map_err(|_| MessageParseError::InvalidCommand)?;
    let (rest, params) = parse_params(rest);
    if !rest.is_empty() {
        return Err(context(line, rest));
    }

    Ok(LineParts {
        tags,
        prefix,
        command,
        params,
    })
}

fn context(line: &str, rest: &str) -> MessageParseError {
    MessageParseError::ParseContext {
        position: line.len() - rest.len(),
        context: "unexpected characters after command".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let parts = split_line("PING").unwrap();
        assert_eq!(parts.command, "PING");
        assert!(parts.tags.is_none());
        assert!(parts.prefix.is_none());
        assert!(parts.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix() {
        let parts = split_line(":nick!user@host PRIVMSG #channel :Hello there").unwrap();
        assert_eq!(parts.prefix, Some("nick!user@host"));
        assert_eq!(parts.command, "PRIVMSG");
        assert_eq!(parts.params.as_slice(), &["#channel", "Hello there"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let parts = split_line("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(parts.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(parts.prefix, Some("nick"));
    }

    #[test]
    fn test_parse_strips_line_terminator() {
        let parts = split_line("PING :server\r\n").unwrap();
        assert_eq!(parts.params.as_slice(), &["server"]);
    }

    #[test]
    fn test_parse_collapses_spaces() {
        let parts = split_line("MODE  #chan   +o  nick").unwrap();
        assert_eq!(parts.params.as_slice(), &["#chan", "+o", "nick"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let parts = split_line("PRIVMSG #channel :").unwrap();
        assert_eq!(parts.params.as_slice(), &["#channel", ""]);
    }

    #[test]
    fn test_parse_command_validation() {
        assert!(split_line("PING").is_ok());
        assert!(split_line("123").is_ok());
        assert_eq!(split_line("PING123"), Err(MessageParseError::InvalidCommand));
        assert_eq!(split_line("12"), Err(MessageParseError::InvalidCommand));
        assert_eq!(split_line("1234"), Err(MessageParseError::InvalidCommand));
    }

    #[test]
    fn test_parse_framing_errors() {
        assert_eq!(split_line(""), Err(MessageParseError::EmptyMessage));
        assert_eq!(split_line("   "), Err(MessageParseError::EmptyMessage));
        assert_eq!(
            split_line(":irc.example.com"),
            Err(MessageParseError::UnterminatedOrigin)
        );
        assert_eq!(split_line("@a=b"), Err(MessageParseError::UnterminatedTags));
        assert!(matches!(
            split_line("PRIVMSG:x"),
            Err(MessageParseError::ParseContext { position: 7, .. })
        ));
    }

    #[test]
    fn test_fifteenth_param_takes_rest() {
        let raw = "CMD p1 p2 p3 p4 p5 p6 p7 p8 p9 p10 p11 p12 p13 p14 p15 p16";
        let parts = split_line(raw).unwrap();
        assert_eq!(parts.params.len(), 15);
        assert_eq!(parts.params[14], "p15 p16");
    }

    #[test]
    fn test_parse_mode_with_space_trailing() {
        let parts = split_line("MODE #chan +k : ").unwrap();
        assert_eq!(parts.params.as_slice(), &["#chan", "+k", " "]);
    }
}
