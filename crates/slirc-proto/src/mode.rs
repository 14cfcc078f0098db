//! Table-driven mode string parsing.
//!
//! Whether a channel mode letter consumes a parameter depends on the
//! server's `CHANMODES` and `PREFIX` tokens, so channel mode parsing always
//! goes through an [`ISupportTable`].

use std::fmt;

use crate::error::ModeParseError;
use crate::isupport::{ISupportTable, ModeClass};

/// Direction of a mode change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Mode is being set.
    #[default]
    Plus,
    /// Mode is being removed.
    Minus,
}

impl Sign {
    /// The sign character.
    pub fn as_char(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One change from a mode string, e.g. `+o nick`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeDelta {
    /// Set or unset.
    pub sign: Sign,
    /// Mode letter.
    pub mode: char,
    /// Parameter consumed by this mode, if any.
    pub param: Option<String>,
}

impl ModeDelta {
    /// A delta without a parameter.
    pub fn new(sign: Sign, mode: char) -> Self {
        Self {
            sign,
            mode,
            param: None,
        }
    }

    /// A delta with a parameter.
    pub fn with_param(sign: Sign, mode: char, param: impl Into<String>) -> Self {
        Self {
            sign,
            mode,
            param: Some(param.into()),
        }
    }
}

impl fmt::Display for ModeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign, self.mode)?;
        if let Some(ref param) = self.param {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

/// Parse a channel mode string and its parameters.
///
/// `args` is the mode string followed by its parameters, as they appear
/// after the channel name in a `MODE` line. A list mode without a parameter
/// is a list query and yields `param: None`. Surplus parameters are ignored.
///
/// ```
/// use slirc_proto::{parse_channel_modes, ISupportTable, ModeDelta, Sign};
///
/// let table = ISupportTable::new();
/// let deltas = parse_channel_modes(&["+ol-k", "alice", "10", "key"], &table).unwrap();
/// assert_eq!(deltas, vec![
///     ModeDelta::with_param(Sign::Plus, 'o', "alice"),
///     ModeDelta::with_param(Sign::Plus, 'l', "10"),
///     ModeDelta::with_param(Sign::Minus, 'k', "key"),
/// ]);
/// ```
pub fn parse_channel_modes<S: AsRef<str>>(
    args: &[S],
    table: &ISupportTable,
) -> Result<Vec<ModeDelta>, ModeParseError> {
    let (modestr, rest) = args.split_first().ok_or(ModeParseError::EmptyModeString)?;
    let chanmodes = table.chanmodes();
    let prefix = table.prefix();
    let mut params = rest.iter().map(AsRef::as_ref);

    walk(modestr.as_ref(), |sign, mode| {
        let class = chanmodes.classify(mode, &prefix);
        if !class.takes_param(sign == Sign::Plus) {
            return Ok(ModeDelta::new(sign, mode));
        }
        match params.next() {
            Some(param) => Ok(ModeDelta::with_param(sign, mode, param)),
            None if class == ModeClass::List => Ok(ModeDelta::new(sign, mode)),
            None => Err(ModeParseError::MissingParameter {
                sign: sign.as_char(),
                mode,
            }),
        }
    })
}

/// Parse a user mode string such as `+iw-x`. User modes never take
/// parameters.
pub fn parse_user_modes(modestr: &str) -> Result<Vec<ModeDelta>, ModeParseError> {
    walk(modestr, |sign, mode| Ok(ModeDelta::new(sign, mode)))
}

fn walk<F>(modestr: &str, mut each: F) -> Result<Vec<ModeDelta>, ModeParseError>
where
    F: FnMut(Sign, char) -> Result<ModeDelta, ModeParseError>,
{
    if modestr.is_empty() {
        return Err(ModeParseError::EmptyModeString);
    }

    let mut sign = Sign::Plus;
    let mut deltas = Vec::new();
    for c in modestr.chars() {
        match c {
            '+' => sign = Sign::Plus,
            '-' => sign = Sign::Minus,
            c => deltas.push(each(sign, c)?),
        }
    }
    Ok(deltas)
}
