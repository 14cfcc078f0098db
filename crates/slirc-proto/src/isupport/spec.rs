//! Structured views of the `PREFIX` and `CHANMODES` tokens.

/// Parsed `PREFIX` token, e.g. `(ov)@+`.
///
/// Maps channel status modes (`o`, `v`) to their nick prefix symbols (`@`, `+`).
///
/// ```
/// use slirc_proto::PrefixSpec;
///
/// let spec = PrefixSpec::parse("(qaohv)~&@%+").unwrap();
/// assert_eq!(spec.prefix_for_mode('o'), Some('@'));
/// assert_eq!(spec.mode_for_prefix('+'), Some('v'));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixSpec {
    /// Mode characters, e.g. `ov`.
    pub modes: String,
    /// Prefix symbols in the same order, e.g. `@+`.
    pub prefixes: String,
}

impl PrefixSpec {
    /// Parse a `PREFIX` value. An empty value means no status modes.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return Some(Self {
                modes: String::new(),
                prefixes: String::new(),
            });
        }
        let rest = s.strip_prefix('(')?;
        let (modes, prefixes) = rest.split_once(')')?;
        if modes.chars().count() != prefixes.chars().count() {
            return None;
        }
        Some(Self {
            modes: modes.to_string(),
            prefixes: prefixes.to_string(),
        })
    }

    /// True if `mode` is a channel status mode (takes a nick parameter).
    #[inline]
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.modes.contains(mode)
    }

    /// Prefix symbol for a status mode.
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.modes
            .chars()
            .position(|c| c == mode)
            .and_then(|i| self.prefixes.chars().nth(i))
    }

    /// Status mode for a prefix symbol.
    pub fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.prefixes
            .chars()
            .position(|c| c == prefix)
            .and_then(|i| self.modes.chars().nth(i))
    }
}

/// How a channel mode letter consumes parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeClass {
    /// Type A list mode (bans, exceptions): always has a parameter.
    List,
    /// Type B: always has a parameter.
    AlwaysParam,
    /// Type C: has a parameter only when being set.
    SetParam,
    /// A `PREFIX` status mode: always has a nick parameter.
    Status,
    /// Type D, or unknown: never has a parameter.
    NoParam,
}

impl ModeClass {
    /// Whether a mode of this class consumes a parameter under the given sign.
    pub fn takes_param(self, setting: bool) -> bool {
        match self {
            Self::List | Self::AlwaysParam | Self::Status => true,
            Self::SetParam => setting,
            Self::NoParam => false,
        }
    }
}

/// Parsed `CHANMODES` token, e.g. `b,k,l,imnpstr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A: list modes.
    pub a: String,
    /// Type B: parameter on set and unset.
    pub b: String,
    /// Type C: parameter on set only.
    pub c: String,
    /// Type D: no parameter.
    pub d: String,
}

impl ChanModes {
    /// Parse a `CHANMODES` value. Extra groups beyond the fourth are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        Some(Self {
            a: parts.next()?.to_string(),
            b: parts.next()?.to_string(),
            c: parts.next()?.to_string(),
            d: parts.next()?.to_string(),
        })
    }

    /// Classify a mode letter. Status modes from `PREFIX` take precedence.
    pub fn classify(&self, mode: char, prefix: &PrefixSpec) -> ModeClass {
        if prefix.is_prefix_mode(mode) {
            ModeClass::Status
        } else if self.a.contains(mode) {
            ModeClass::List
        } else if self.b.contains(mode) {
            ModeClass::AlwaysParam
        } else if self.c.contains(mode) {
            ModeClass::SetParam
        } else {
            ModeClass::NoParam
        }
    }
}
