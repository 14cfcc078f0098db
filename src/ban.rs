//! Host bans by nick.
//!
//! Banning a nick needs its host first: we ask with USERHOST and set
//! `+b *!*@host` when the reply comes back in time.

use std::time::Duration;

use slirc_proto::{CaseMapping, RawMessage, Response, UserAddress};
use tokio::time::Instant;
use tracing::debug;

use crate::event::{MessageKind, ParsedMessage};

/// A USERHOST reply older than this no longer triggers the ban.
pub const BAN_WINDOW: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
struct PendingBan {
    channel: String,
    nick: String,
    issued: Instant,
}

#[derive(Debug, Default)]
pub struct BanTracker {
    pending: Vec<PendingBan>,
}

impl BanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Start a ban of `nick` on `channel`. Returns the USERHOST query.
    pub fn request(&mut self, channel: &str, nick: &str, now: Instant) -> RawMessage {
        self.pending.push(PendingBan {
            channel: channel.to_string(),
            nick: nick.to_string(),
            issued: now,
        });
        RawMessage::new("USERHOST", [nick.to_string()])
    }

    /// Handle RPL_USERHOST replies.
    pub fn feed(&mut self, msg: &ParsedMessage, casemap: CaseMapping, now: Instant) -> Vec<RawMessage> {
        let MessageKind::Numeric { code, params, .. } = &msg.kind else {
            return Vec::new();
        };
        if *code != Response::RPL_USERHOST.code() {
            return Vec::new();
        }

        let mut out = Vec::new();
        for reply in params.iter().flat_map(|p| p.split_whitespace()) {
            let Some(addr) = parse_userhost(reply) else {
                continue;
            };
            let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|p| casemap.equals(&p.nick, addr.nick()));
            self.pending = rest;

            for ban in matched {
                if now.saturating_duration_since(ban.issued) > BAN_WINDOW {
                    debug!(nick = %ban.nick, channel = %ban.channel, "USERHOST reply too late, ban dropped");
                    continue;
                }
                out.push(RawMessage::new(
                    "MODE",
                    [ban.channel, "+b".to_string(), addr.host_mask()],
                ));
            }
        }
        out
    }

    /// Forget requests whose window has passed.
    pub fn expire(&mut self, now: Instant) {
        self.pending
            .retain(|p| now.saturating_duration_since(p.issued) <= BAN_WINDOW);
    }
}

/// Parse one `nick[*]=[+-]user@host` USERHOST entry.
fn parse_userhost(reply: &str) -> Option<UserAddress> {
    let (nick, rest) = reply.split_once('=')?;
    let nick = nick.trim_end_matches('*');
    let rest = rest.trim_start_matches(['+', '-']);
    let (user, host) = rest.split_once('@')?;
    if nick.is_empty() || host.is_empty() {
        return None;
    }
    Some(UserAddress::new(nick, user, host))
}
