//! Character encoding resolution.
//!
//! Lines are framed and split as ISO-8859-1 so every byte survives; text is
//! then re-decoded with the encoding resolved for its context. Priority is
//! sender mask, then channel, then server, then the global default.

use encoding_rs::Encoding;
use slirc_proto::{UserAddress, latin1_encode};

use crate::context::ServerId;
use crate::prefs::{EncodingScope, Preferences};

/// Resolves encodings for one connection.
pub struct EncodingResolver<'a> {
    prefs: &'a dyn Preferences,
    server: &'a ServerId,
}

impl<'a> EncodingResolver<'a> {
    pub fn new(prefs: &'a dyn Preferences, server: &'a ServerId) -> Self {
        Self { prefs, server }
    }

    /// Server override, else the global default. Used for identifiers and
    /// for commands that have no channel/user context.
    pub fn server_level(&self) -> &'static Encoding {
        self.prefs
            .encoding_override(EncodingScope::Server(self.server))
            .unwrap_or_else(|| self.prefs.default_encoding())
    }

    /// Full resolution for a message with the given context.
    pub fn resolve(&self, mask: Option<&UserAddress>, channel: Option<&str>) -> &'static Encoding {
        mask.and_then(|m| self.prefs.encoding_override(EncodingScope::Mask(m)))
            .or_else(|| {
                channel.and_then(|c| self.prefs.encoding_override(EncodingScope::Channel(c)))
            })
            .unwrap_or_else(|| self.server_level())
    }
}

/// Re-decode a field of a latin1-framed line with `encoding`.
pub fn decode_text(field: &str, encoding: &'static Encoding) -> String {
    let bytes = latin1_encode(field);
    let (text, _) = encoding.decode_without_bom_handling(&bytes);
    text.into_owned()
}

/// Encode outbound text. Unmappable characters become numeric references,
/// as `encoding_rs` does for legacy encodings.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use slirc_proto::latin1_decode;

    #[test]
    fn decode_reinterprets_latin1_view() {
        let framed = latin1_decode("h\u{e9}llo".as_bytes());
        assert_eq!(decode_text(&framed, encoding_rs::UTF_8), "h\u{e9}llo");

        let framed = latin1_decode(b"caf\xe9");
        assert_eq!(decode_text(&framed, encoding_rs::WINDOWS_1252), "caf\u{e9}");
    }

    #[test]
    fn encode_round_trips_through_decode() {
        let bytes = encode_text("caf\u{e9}", encoding_rs::WINDOWS_1252);
        assert_eq!(bytes, b"caf\xe9");
    }

    #[test]
    fn resolution_priority() {
        let config: Config = r##"
[[server]]
id = "net"
host = "irc.example.net"
encoding = "iso-8859-2"

[encoding]
default = "utf-8"
channels = { "#pl" = "windows-1250" }
masks = { "*!*@*.ru" = "koi8-r" }
"##
        .parse()
        .unwrap();
        let server = ServerId::new("net");
        let resolver = EncodingResolver::new(&config, &server);
        let ivan = UserAddress::parse("ivan!i@h.example.ru");
        let jan = UserAddress::parse("jan!j@h.example.pl");

        assert_eq!(resolver.resolve(Some(&ivan), Some("#pl")), encoding_rs::KOI8_R);
        assert_eq!(resolver.resolve(Some(&jan), Some("#pl")), encoding_rs::WINDOWS_1250);
        assert_eq!(resolver.resolve(Some(&jan), None), encoding_rs::ISO_8859_2);

        let other = ServerId::new("other");
        let resolver = EncodingResolver::new(&config, &other);
        assert_eq!(resolver.resolve(None, None), encoding_rs::UTF_8);
    }
}
