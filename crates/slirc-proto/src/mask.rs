//! `nick!user@host` addresses and wildcard masks.
//!
//! A [`UserAddress`] is used both for message sources (fully specified) and
//! for ignore/watch/ban masks (fields may be empty or contain `*`/`?`).
//! Matching is per field and case-insensitive; set membership compares the
//! canonical mask string, where an empty field renders as `*`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::casemap::CaseMapping;

/// A `nick!user@host` triple. Immutable once constructed.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserAddress {
    nick: String,
    user: String,
    host: String,
}

impl UserAddress {
    /// Build an address from its three fields. Empty fields act as `*`.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Parse a lenient `nick!user@host` string.
    ///
    /// `nick`, `nick@host` and `nick!user` are all accepted; missing fields
    /// are left empty.
    pub fn parse(s: &str) -> Self {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Part {
            Nick,
            User,
            Host,
        }

        let mut nick = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut part = Part::Nick;

        for c in s.chars() {
            match c {
                '!' if part == Part::Nick => part = Part::User,
                '@' if part != Part::Host => part = Part::Host,
                _ => match part {
                    Part::Nick => nick.push(c),
                    Part::User => user.push(c),
                    Part::Host => host.push(c),
                },
            }
        }

        Self { nick, user, host }
    }

    /// True if a message prefix names a server rather than a user.
    pub fn is_server_name(prefix: &str) -> bool {
        prefix.contains('.') && !prefix.contains('!') && !prefix.contains('@')
    }

    /// The nick field, `*` when empty.
    pub fn nick(&self) -> &str {
        field(&self.nick)
    }

    /// The user (ident) field, `*` when empty.
    pub fn user(&self) -> &str {
        field(&self.user)
    }

    /// The host field, `*` when empty.
    pub fn host(&self) -> &str {
        field(&self.host)
    }

    /// Canonical mask string, e.g. `nick!*@*`.
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick(), self.user(), self.host())
    }

    /// A host ban mask for this address: `*!*@host`.
    pub fn host_mask(&self) -> String {
        format!("*!*@{}", self.host())
    }

    /// True if any field contains a wildcard or is empty.
    pub fn has_wildcards(&self) -> bool {
        [self.nick(), self.user(), self.host()]
            .iter()
            .any(|f| f.contains(['*', '?']))
    }

    /// True if the nick field names exactly one nickname (no wildcards).
    pub fn has_literal_nick(&self) -> bool {
        !self.nick.is_empty() && !self.nick.contains(['*', '?'])
    }

    /// Match another address against this one as a pattern (rfc1459 folding).
    pub fn matches(&self, other: &UserAddress) -> bool {
        self.matches_with(other, CaseMapping::Rfc1459)
    }

    /// Match another address against this one as a pattern.
    pub fn matches_with(&self, other: &UserAddress, casemap: CaseMapping) -> bool {
        wildcard_match_with(self.nick(), other.nick(), casemap)
            && wildcard_match_with(self.user(), other.user(), casemap)
            && wildcard_match_with(self.host(), other.host(), casemap)
    }

    /// Match only the nick field of this pattern against a nickname.
    pub fn matches_nick(&self, nick: &str, casemap: CaseMapping) -> bool {
        wildcard_match_with(self.nick(), nick, casemap)
    }
}

fn field(s: &str) -> &str {
    if s.is_empty() {
        "*"
    } else {
        s
    }
}

impl PartialEq for UserAddress {
    fn eq(&self, other: &Self) -> bool {
        self.nick() == other.nick() && self.user() == other.user() && self.host() == other.host()
    }
}

impl Eq for UserAddress {}

impl Hash for UserAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nick().hash(state);
        self.user().hash(state);
        self.host().hash(state);
    }
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick(), self.user(), self.host())
    }
}

impl FromStr for UserAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for UserAddress {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Match a string against a wildcard pattern with rfc1459 case folding.
///
/// `*` matches zero or more characters, `?` exactly one.
///
/// ```
/// use slirc_proto::wildcard_match;
///
/// assert!(wildcard_match("*.example.com", "USER.EXAMPLE.COM"));
/// assert!(wildcard_match("te?t", "test"));
/// assert!(!wildcard_match("te?t", "tests"));
/// ```
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    wildcard_match_with(pattern, text, CaseMapping::Rfc1459)
}

/// Match a string against a wildcard pattern under the given casemapping.
pub fn wildcard_match_with(pattern: &str, text: &str, casemap: CaseMapping) -> bool {
    let pattern: Vec<char> = pattern.chars().map(|c| casemap.lower_char(c)).collect();
    let text: Vec<char> = text.chars().map(|c| casemap.lower_char(c)).collect();

    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            // backtrack: let the last '*' swallow one more char
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let addr = UserAddress::parse("nick!user@host.com");
        assert_eq!(addr.nick(), "nick");
        assert_eq!(addr.user(), "user");
        assert_eq!(addr.host(), "host.com");
    }

    #[test]
    fn test_parse_nick_only_is_canonicalised() {
        let addr = UserAddress::parse("troll");
        assert_eq!(addr.mask(), "troll!*@*");
        assert_eq!(addr, UserAddress::parse("troll!*@*"));
        assert!(addr.has_literal_nick());
        assert!(addr.has_wildcards());
    }

    #[test]
    fn test_parse_nick_at_host() {
        let addr = UserAddress::parse("nick@host");
        assert_eq!(addr.user(), "*");
        assert_eq!(addr.host(), "host");
    }

    #[test]
    fn test_matches_per_field() {
        let source = UserAddress::parse("Troll!evil@bad.example.net");
        assert!(UserAddress::parse("*!*@*.example.net").matches(&source));
        assert!(UserAddress::parse("troll").matches(&source));
        assert!(UserAddress::parse("tr?ll!*@*").matches(&source));
        assert!(!UserAddress::parse("*!good@*").matches(&source));
    }

    #[test]
    fn test_matches_nick_casemapped() {
        let pattern = UserAddress::parse("nick[away]");
        assert!(pattern.matches_nick("NICK{AWAY}", CaseMapping::Rfc1459));
        assert!(!pattern.matches_nick("NICK{AWAY}", CaseMapping::Ascii));
    }

    #[test]
    fn test_host_mask() {
        let addr = UserAddress::parse("troll!user@host.example");
        assert_eq!(addr.host_mask(), "*!*@host.example");
    }

    #[test]
    fn test_server_name_detection() {
        assert!(UserAddress::is_server_name("irc.example.com"));
        assert!(!UserAddress::is_server_name("nick"));
        assert!(!UserAddress::is_server_name("nick!user@host.com"));
    }

    #[test]
    fn test_wildcard_match_basic() {
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("test*", "testing"));
        assert!(wildcard_match("*test", "unittest"));
        assert!(wildcard_match("*a*b*c*", "xaybzc"));
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("", "something"));
        assert!(!wildcard_match("exact", "exactx"));
    }

    #[test]
    fn test_wildcard_match_case_insensitive() {
        assert!(wildcard_match("TEST*", "testing"));
        assert!(wildcard_match("#channel[*]", "#CHANNEL{test}"));
        assert!(wildcard_match("test~name", "TEST^NAME"));
    }
}
