//! Incremental ISUPPORT token table.

use std::collections::HashMap;

use super::spec::{ChanModes, PrefixSpec};
use crate::casemap::CaseMapping;

const DEFAULT_CHANTYPES: &str = "#&";
const DEFAULT_PREFIX: &str = "(ov)@+";
const DEFAULT_CHANMODES: &str = "b,k,l,imnpstr";
const DEFAULT_MODES: usize = 3;

/// Per-connection map of advertised ISUPPORT tokens.
///
/// Names are stored uppercased. A token without a value is stored with an
/// empty value. `-NAME` removes a previously advertised token.
///
/// ```
/// use slirc_proto::ISupportTable;
///
/// let mut table = ISupportTable::new();
/// assert_eq!(table.chantypes(), "#&");
///
/// table.apply(["CHANTYPES=#", "WATCH=128", "NETWORK=Example\\x20Net"]);
/// assert_eq!(table.chantypes(), "#");
/// assert_eq!(table.watch_limit(), 128);
/// assert_eq!(table.network(), Some("Example Net"));
///
/// table.apply(["-WATCH"]);
/// assert_eq!(table.watch_limit(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ISupportTable {
    tokens: HashMap<String, String>,
}

impl ISupportTable {
    /// Create an empty table. Every accessor returns its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of raw tokens into the table.
    pub fn apply<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for token in tokens {
            self.apply_token(token);
        }
    }

    /// Fold the parameters of one `005` reply into the table.
    ///
    /// The first parameter (our nick) is skipped, as is the human-readable
    /// trailing text ("are supported by this server").
    pub fn apply_reply<S: AsRef<str>>(&mut self, params: &[S]) {
        let tokens = params.iter().skip(1).map(AsRef::as_ref);
        let count = params.len().saturating_sub(1);
        for (i, token) in tokens.enumerate() {
            if i + 1 == count && token.contains(' ') {
                break;
            }
            self.apply_token(token);
        }
    }

    fn apply_token(&mut self, token: &str) {
        if token.is_empty() || token.contains(' ') {
            return;
        }
        if let Some(name) = token.strip_prefix('-') {
            self.tokens.remove(&name.to_ascii_uppercase());
            return;
        }
        let (name, value) = match token.split_once('=') {
            Some((name, value)) => (name, decode_value(value)),
            None => (token, String::new()),
        };
        if name.is_empty() {
            return;
        }
        self.tokens.insert(name.to_ascii_uppercase(), value);
    }

    /// True if the token has been advertised (with or without a value).
    pub fn contains(&self, name: &str) -> bool {
        self.tokens.contains_key(&name.to_ascii_uppercase())
    }

    /// Raw value of a token. Valueless tokens yield `Some("")`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    fn get_nonempty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    fn get_number(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Number of tokens currently held.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if nothing has been advertised yet.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Channel type prefix characters. Defaults to `#&`.
    pub fn chantypes(&self) -> &str {
        self.get_nonempty("CHANTYPES").unwrap_or(DEFAULT_CHANTYPES)
    }

    /// Status modes and their nick prefixes. Defaults to `(ov)@+`.
    pub fn prefix(&self) -> PrefixSpec {
        self.get("PREFIX")
            .and_then(PrefixSpec::parse)
            .or_else(|| PrefixSpec::parse(DEFAULT_PREFIX))
            .unwrap_or_else(|| PrefixSpec {
                modes: "ov".to_string(),
                prefixes: "@+".to_string(),
            })
    }

    /// Channel mode classes. Defaults to `b,k,l,imnpstr`.
    pub fn chanmodes(&self) -> ChanModes {
        self.get("CHANMODES")
            .and_then(ChanModes::parse)
            .or_else(|| ChanModes::parse(DEFAULT_CHANMODES))
            .unwrap_or_else(|| ChanModes {
                a: "b".to_string(),
                b: "k".to_string(),
                c: "l".to_string(),
                d: "imnpstr".to_string(),
            })
    }

    /// Prefixes usable on a message target to address only channel members
    /// with that status. Falls back to the `PREFIX` symbols.
    pub fn statusmsg(&self) -> String {
        match self.get_nonempty("STATUSMSG") {
            Some(value) => value.to_string(),
            None => self.prefix().prefixes,
        }
    }

    /// Maximum parameterised mode changes per `MODE` line. Defaults to 3.
    pub fn modes(&self) -> usize {
        self.get_number("MODES").unwrap_or(DEFAULT_MODES)
    }

    /// Native `WATCH` list capacity, 0 if unsupported.
    pub fn watch_limit(&self) -> usize {
        self.get_number("WATCH").unwrap_or(0)
    }

    /// Server-side `SILENCE` list capacity, 0 if unsupported.
    pub fn silence_limit(&self) -> usize {
        self.get_number("SILENCE").unwrap_or(0)
    }

    /// Maximum nickname length, if advertised.
    pub fn nicklen(&self) -> Option<usize> {
        self.get_number("NICKLEN")
    }

    /// Maximum topic length, if advertised.
    pub fn topiclen(&self) -> Option<usize> {
        self.get_number("TOPICLEN")
    }

    /// Network name, if advertised.
    pub fn network(&self) -> Option<&str> {
        self.get_nonempty("NETWORK")
    }

    /// Casemapping rule. Defaults to rfc1459.
    pub fn casemapping(&self) -> CaseMapping {
        self.get_nonempty("CASEMAPPING")
            .map(CaseMapping::from_token)
            .unwrap_or_default()
    }

    /// True if `target` names a channel under the advertised `CHANTYPES`.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.chantypes().contains(c))
    }

    /// Split a `STATUSMSG`-prefixed channel target, e.g. `@#chan`.
    ///
    /// Returns the status prefix (if any) and the bare target.
    pub fn split_status_target<'a>(&self, target: &'a str) -> (Option<char>, &'a str) {
        let mut chars = target.chars();
        match chars.next() {
            Some(c) if self.statusmsg().contains(c) && self.is_channel(chars.as_str()) => {
                (Some(c), chars.as_str())
            }
            _ => (None, target),
        }
    }
}

/// Decode `\xHH` escapes in an ISUPPORT value.
///
/// Malformed escapes are kept literally.
pub fn decode_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            let hex = std::str::from_utf8(&bytes[i + 2..i + 4]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isupport::ModeClass;

    #[test]
    fn defaults_when_empty() {
        let table = ISupportTable::new();
        assert_eq!(table.chantypes(), "#&");
        assert_eq!(table.prefix(), PrefixSpec::parse("(ov)@+").unwrap());
        assert_eq!(table.chanmodes(), ChanModes::parse("b,k,l,imnpstr").unwrap());
        assert_eq!(table.statusmsg(), "@+");
        assert_eq!(table.modes(), 3);
        assert_eq!(table.watch_limit(), 0);
        assert_eq!(table.silence_limit(), 0);
        assert_eq!(table.casemapping(), CaseMapping::Rfc1459);
        assert!(table.network().is_none());
    }

    #[test]
    fn apply_reply_skips_target_and_trailing_text() {
        let mut table = ISupportTable::new();
        table.apply_reply(&[
            "me",
            "PREFIX=(qov)~@+",
            "CHANMODES=beI,k,l,imnst",
            "EXCEPTS",
            "are supported by this server",
        ]);
        assert_eq!(table.len(), 3);
        assert!(table.contains("excepts"));
        assert_eq!(table.get("EXCEPTS"), Some(""));
        assert_eq!(table.statusmsg(), "~@+");
        assert_eq!(
            table.chanmodes().classify('q', &table.prefix()),
            ModeClass::Status
        );
    }

    #[test]
    fn explicit_statusmsg_wins() {
        let mut table = ISupportTable::new();
        table.apply(["PREFIX=(ohv)@%+", "STATUSMSG=@"]);
        assert_eq!(table.statusmsg(), "@");
    }

    #[test]
    fn negation_removes_token() {
        let mut table = ISupportTable::new();
        table.apply(["SILENCE=15", "MODES=6"]);
        assert_eq!(table.silence_limit(), 15);
        assert_eq!(table.modes(), 6);
        table.apply(["-SILENCE", "-modes"]);
        assert_eq!(table.silence_limit(), 0);
        assert_eq!(table.modes(), 3);
    }

    #[test]
    fn later_values_override() {
        let mut table = ISupportTable::new();
        table.apply(["CHANTYPES=#"]);
        table.apply(["CHANTYPES=#&!"]);
        assert_eq!(table.chantypes(), "#&!");
    }

    #[test]
    fn escaped_values_decode() {
        assert_eq!(decode_value("Example\\x20Net"), "Example Net");
        assert_eq!(decode_value("a\\x3Db"), "a=b");
        assert_eq!(decode_value("bad\\xZZ"), "bad\\xZZ");
        assert_eq!(decode_value("tail\\x2"), "tail\\x2");
    }

    #[test]
    fn channel_targets() {
        let mut table = ISupportTable::new();
        assert!(table.is_channel("#rust"));
        assert!(table.is_channel("&local"));
        assert!(!table.is_channel("nick"));
        assert!(!table.is_channel(""));
        assert_eq!(table.split_status_target("@#rust"), (Some('@'), "#rust"));
        assert_eq!(table.split_status_target("#rust"), (None, "#rust"));
        assert_eq!(table.split_status_target("+nick"), (None, "+nick"));

        table.apply(["CHANTYPES=#"]);
        assert!(!table.is_channel("&local"));
    }

    #[test]
    fn malformed_values_fall_back() {
        let mut table = ISupportTable::new();
        table.apply(["PREFIX=ov@+", "CHANMODES=b,k", "WATCH=lots"]);
        assert_eq!(table.prefix().prefixes, "@+");
        assert_eq!(table.chanmodes().d, "imnpstr");
        assert_eq!(table.watch_limit(), 0);
    }
}
