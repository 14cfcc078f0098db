//! `Preferences` backed by the TOML configuration.

use encoding_rs::Encoding;
use slirc_proto::{UserAddress, irc_eq};

use super::Config;
use crate::context::ServerId;
use crate::prefs::{EncodingScope, Preferences, Reconcile};

fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
}

impl Preferences for Config {
    fn default_nick(&self) -> String {
        self.identity.nick.clone()
    }

    fn username(&self) -> String {
        self.identity.username.clone()
    }

    fn realname(&self) -> String {
        self.identity.realname.clone()
    }

    fn quit_message(&self) -> String {
        self.identity.quit_message.clone()
    }

    fn server_password(&self, server: &ServerId) -> Option<String> {
        self.server(server.as_str())?.password.clone()
    }

    fn identify_command(&self, nick: &str) -> Option<String> {
        self.identify
            .iter()
            .find(|block| irc_eq(&block.nick, nick))
            .map(|block| block.render(nick))
    }

    fn default_encoding(&self) -> &'static Encoding {
        lookup(&self.encoding.default).unwrap_or(encoding_rs::UTF_8)
    }

    fn encoding_override(&self, scope: EncodingScope<'_>) -> Option<&'static Encoding> {
        match scope {
            EncodingScope::Mask(addr) => self
                .encoding
                .masks
                .iter()
                .find(|(mask, _)| UserAddress::parse(mask).matches(addr))
                .and_then(|(_, label)| lookup(label)),
            EncodingScope::Channel(channel) => self
                .encoding
                .channels
                .iter()
                .find(|(name, _)| irc_eq(name, channel))
                .and_then(|(_, label)| lookup(label)),
            EncodingScope::Server(id) => self
                .server(id.as_str())
                .and_then(|s| s.encoding.as_deref())
                .and_then(lookup),
        }
    }

    fn reconcile_server(&self, _server: &ServerId, host: &str, _network: Option<&str>) -> Reconcile {
        if !self.identity.confirm_unknown_servers {
            return Reconcile::Accept;
        }
        if self.servers.iter().any(|s| s.host.eq_ignore_ascii_case(host)) {
            Reconcile::Accept
        } else {
            Reconcile::Confirm
        }
    }

    fn keepalive_ticks(&self, server: &ServerId) -> u32 {
        match self.server(server.as_str()) {
            Some(s) if s.frequent_keepalive => self.keepalive.frequent_probe_ticks,
            _ => self.keepalive.probe_ticks,
        }
    }
}
