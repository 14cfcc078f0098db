//! Presence tracking over WATCH, with ISON polling as the fallback.
//!
//! Each connection gets its own [`PresenceTracker`]. Masks are placed on
//! the server's native WATCH list while it has room; the rest are polled
//! with batched ISON. Every actual online/offline transition is reported
//! exactly once.

mod ison;

use std::collections::{HashSet, VecDeque};

use slirc_proto::{CaseMapping, ISupportTable, MAX_LINE_PAYLOAD, RawMessage, Response, UserAddress};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::event::{MessageKind, ParsedMessage};

pub use ison::{POLL_INTERVAL, POLL_PER_EXTRA_LINE, batch_budget, batches};

/// Unanswered ISON batches kept for reply alignment. Older ones are
/// assumed lost.
const MAX_INFLIGHT: usize = 8;

/// A mutation of the watch set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenceOp {
    AddPermanent(UserAddress),
    RemovePermanent(UserAddress),
    AddTemporary(UserAddress),
    RemoveTemporary(UserAddress),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// On the server's WATCH list.
    Native,
    /// Polled with ISON (or, without a literal nick, seen only by sightings).
    Polled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresenceState {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Clone, Debug)]
pub struct WatchEntry {
    pub mask: UserAddress,
    pub permanent: bool,
    pub temp_refs: u32,
    pub placement: Placement,
    pub state: PresenceState,
}

impl WatchEntry {
    fn retained(&self) -> bool {
        self.permanent || self.temp_refs > 0
    }
}

/// Output of the tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenceAction {
    Send(RawMessage),
    Changed {
        mask: UserAddress,
        nick: String,
        online: bool,
    },
}

/// What a line told us about a user.
enum Sighting<'a> {
    Address(&'a UserAddress),
    Nick(&'a str),
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    started: bool,
    pending: Vec<PresenceOp>,
    entries: Vec<WatchEntry>,
    capacity: usize,
    casemap: CaseMapping,
    next_poll: Option<Instant>,
    inflight: VecDeque<Vec<String>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    /// Apply a mutation, or queue it until [`Self::start`] has run.
    pub fn apply(&mut self, op: PresenceOp) -> Vec<PresenceAction> {
        if !self.started {
            self.pending.push(op);
            return Vec::new();
        }
        let mut out = Vec::new();
        self.apply_op(op, true, &mut out);
        out
    }

    /// Place every queued mask and send the initial WATCH burst.
    pub fn start(&mut self, isupport: &ISupportTable, now: Instant) -> Vec<PresenceAction> {
        if self.started {
            return Vec::new();
        }
        self.started = true;
        self.capacity = isupport.watch_limit();
        self.casemap = isupport.casemapping();
        self.next_poll = Some(now);

        let mut discard = Vec::new();
        for op in std::mem::take(&mut self.pending) {
            self.apply_op(op, false, &mut discard);
        }

        let nicks = self.native_nicks();
        debug!(
            capacity = self.capacity,
            native = nicks.len(),
            polled = self.entries.len().saturating_sub(nicks.len()),
            "presence tracking started"
        );
        watch_burst(nicks.iter().map(String::as_str))
            .into_iter()
            .map(PresenceAction::Send)
            .collect()
    }

    fn apply_op(&mut self, op: PresenceOp, live: bool, out: &mut Vec<PresenceAction>) {
        match op {
            PresenceOp::AddPermanent(mask) => self.add(mask, true, live, out),
            PresenceOp::AddTemporary(mask) => self.add(mask, false, live, out),
            PresenceOp::RemovePermanent(mask) => self.remove(&mask, true, live, out),
            PresenceOp::RemoveTemporary(mask) => self.remove(&mask, false, live, out),
        }
    }

    fn add(&mut self, mask: UserAddress, permanent: bool, live: bool, out: &mut Vec<PresenceAction>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.mask == mask) {
            if permanent {
                entry.permanent = true;
            } else {
                entry.temp_refs += 1;
            }
            return;
        }

        let placement = self.place(&mask);
        if live && placement == Placement::Native && !self.is_native_nick(mask.nick()) {
            out.push(PresenceAction::Send(watch(&format!("+{}", mask.nick()))));
        }
        trace!(mask = %mask, ?placement, "watching");
        self.entries.push(WatchEntry {
            mask,
            permanent,
            temp_refs: u32::from(!permanent),
            placement,
            state: PresenceState::Unknown,
        });
    }

    fn place(&self, mask: &UserAddress) -> Placement {
        if !mask.has_literal_nick() {
            return Placement::Polled;
        }
        if self.is_native_nick(mask.nick()) || self.native_nicks().len() < self.capacity {
            Placement::Native
        } else {
            Placement::Polled
        }
    }

    fn remove(&mut self, mask: &UserAddress, permanent: bool, live: bool, out: &mut Vec<PresenceAction>) {
        let Some(idx) = self.entries.iter().position(|e| &e.mask == mask) else {
            return;
        };
        let entry = &mut self.entries[idx];
        if permanent {
            entry.permanent = false;
        } else {
            entry.temp_refs = entry.temp_refs.saturating_sub(1);
        }
        if entry.retained() {
            return;
        }

        let removed = self.entries.remove(idx);
        trace!(mask = %removed.mask, "unwatching");
        if removed.placement != Placement::Native || self.is_native_nick(removed.mask.nick()) {
            return;
        }
        if live {
            out.push(PresenceAction::Send(watch(&format!("-{}", removed.mask.nick()))));
        }
        self.promote(live, out);
    }

    /// Move the oldest polled literal mask onto the freed WATCH slot.
    fn promote(&mut self, live: bool, out: &mut Vec<PresenceAction>) {
        if self.native_nicks().len() >= self.capacity {
            return;
        }
        let Some(idx) = self
            .entries
            .iter()
            .position(|e| e.placement == Placement::Polled && e.mask.has_literal_nick())
        else {
            return;
        };
        let nick = self.entries[idx].mask.nick().to_string();
        debug!(nick = %nick, "promoting polled mask to WATCH");
        let casemap = self.casemap;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.mask.has_literal_nick() && casemap.equals(e.mask.nick(), &nick))
        {
            entry.placement = Placement::Native;
        }
        if live {
            out.push(PresenceAction::Send(watch(&format!("+{}", nick))));
        }
    }

    fn native_nicks(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.placement == Placement::Native)
            .map(|e| e.mask.nick())
            .filter(|nick| seen.insert(self.casemap.to_lower(nick)))
            .map(str::to_string)
            .collect()
    }

    fn is_native_nick(&self, nick: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.placement == Placement::Native && self.casemap.equals(e.mask.nick(), nick))
    }

    /// Observe one inbound line.
    pub fn feed(&mut self, msg: &ParsedMessage) -> Vec<PresenceAction> {
        let mut out = Vec::new();
        if !self.started {
            return out;
        }

        match &msg.kind {
            MessageKind::Numeric { code, params, .. } => self.numeric(*code, params, &mut out),
            MessageKind::Quit { .. } => {
                if let Some(source) = &msg.source {
                    self.observe(Sighting::Address(source), false, &mut out);
                }
            }
            MessageKind::Nick { new_nick } => {
                if let Some(source) = &msg.source {
                    self.renamed(source, new_nick, &mut out);
                }
            }
            _ => {
                if let Some(source) = &msg.source {
                    self.observe(Sighting::Address(source), true, &mut out);
                }
            }
        }
        out
    }

    fn numeric(&mut self, code: u16, params: &[String], out: &mut Vec<PresenceAction>) {
        let Some(response) = Response::from_code(code) else {
            return;
        };
        match response {
            Response::RPL_LOGON | Response::RPL_NOWON => {
                if let [nick, user, host, ..] = params {
                    let addr = UserAddress::new(nick.as_str(), user.as_str(), host.as_str());
                    self.observe(Sighting::Address(&addr), true, out);
                }
            }
            Response::RPL_LOGOFF | Response::RPL_NOWOFF => {
                if let Some(nick) = params.first() {
                    self.observe(Sighting::Nick(nick), false, out);
                }
            }
            Response::ERR_TOOMANYWATCH => {
                if let Some(nick) = params.first() {
                    self.demote(nick);
                }
            }
            Response::RPL_ISON => self.ison_reply(params, out),
            _ => {}
        }
    }

    fn demote(&mut self, nick: &str) {
        let casemap = self.casemap;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.placement == Placement::Native && casemap.equals(e.mask.nick(), nick))
        {
            debug!(mask = %entry.mask, "WATCH list full, polling instead");
            entry.placement = Placement::Polled;
        }
    }

    fn ison_reply(&mut self, params: &[String], out: &mut Vec<PresenceAction>) {
        let Some(batch) = self.inflight.pop_front() else {
            return;
        };
        let online: Vec<&str> = params
            .last()
            .map(|p| p.split_whitespace().collect())
            .unwrap_or_default();
        for nick in &batch {
            let is_on = online.iter().any(|o| self.casemap.equals(o, nick));
            self.observe(Sighting::Nick(nick), is_on, out);
        }
    }

    /// A nick change only moves masks that stop or start matching.
    fn renamed(&mut self, old: &UserAddress, new_nick: &str, out: &mut Vec<PresenceAction>) {
        let casemap = self.casemap;
        let new = UserAddress::new(new_nick, old.user(), old.host());
        for entry in &mut self.entries {
            let was = entry.mask.matches_with(old, casemap);
            let is = entry.mask.matches_with(&new, casemap);
            let (state, nick) = match (was, is) {
                (_, true) => (PresenceState::Online, new.nick()),
                (true, false) => (PresenceState::Offline, old.nick()),
                (false, false) => continue,
            };
            if entry.state == state {
                continue;
            }
            entry.state = state;
            out.push(PresenceAction::Changed {
                mask: entry.mask.clone(),
                nick: nick.to_string(),
                online: state == PresenceState::Online,
            });
        }
    }

    fn observe(&mut self, sighting: Sighting<'_>, online: bool, out: &mut Vec<PresenceAction>) {
        let casemap = self.casemap;
        let state = if online {
            PresenceState::Online
        } else {
            PresenceState::Offline
        };
        let nick = match &sighting {
            Sighting::Address(addr) => addr.nick(),
            Sighting::Nick(nick) => *nick,
        };

        for entry in &mut self.entries {
            let hit = match &sighting {
                Sighting::Address(addr) => entry.mask.matches_with(addr, casemap),
                Sighting::Nick(nick) => {
                    entry.mask.has_literal_nick() && entry.mask.matches_nick(nick, casemap)
                }
            };
            if !hit || entry.state == state {
                continue;
            }
            entry.state = state;
            out.push(PresenceAction::Changed {
                mask: entry.mask.clone(),
                nick: nick.to_string(),
                online,
            });
        }
    }

    /// Poll polled masks if the schedule says so (driven by the 15 s tick).
    pub fn poll(&mut self, now: Instant, own_nick: &str) -> Vec<PresenceAction> {
        let due = self.next_poll.is_some_and(|at| at <= now);
        if !self.started || !due {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let nicks: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.placement == Placement::Polled && e.mask.has_literal_nick())
            .map(|e| e.mask.nick())
            .filter(|nick| seen.insert(self.casemap.to_lower(nick)))
            .collect();

        let lines = batches(nicks, batch_budget(own_nick));
        self.next_poll = Some(now + ison::next_delay(lines.len()));

        let out = lines
            .iter()
            .map(|batch| PresenceAction::Send(RawMessage::new("ISON", [batch.join(" ")])))
            .collect();
        self.inflight.extend(lines);
        if self.inflight.len() > MAX_INFLIGHT {
            let stale = self.inflight.len() - MAX_INFLIGHT;
            debug!(stale, "dropping unanswered ISON batches");
            self.inflight.drain(..stale);
        }
        out
    }
}

fn watch(arg: &str) -> RawMessage {
    RawMessage::new("WATCH", [arg.to_string()])
}

/// `WATCH +a +b ...` lines, each within the line budget.
fn watch_burst<'a, I>(nicks: I) -> Vec<RawMessage>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = Vec::new();
    let mut args: Vec<String> = Vec::new();
    let mut len = "WATCH".len();

    for nick in nicks {
        let cost = nick.len() + 2;
        if !args.is_empty() && len + cost > MAX_LINE_PAYLOAD {
            lines.push(RawMessage::new("WATCH", std::mem::take(&mut args)));
            len = "WATCH".len();
        }
        len += cost;
        args.push(format!("+{}", nick));
    }
    if !args.is_empty() {
        lines.push(RawMessage::new("WATCH", args));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::ServerId;
    use crate::event::{Classifier, EncodingResolver};
    use chrono::Utc;
    use slirc_proto::latin1_decode;
    use std::time::Duration;

    fn table(tokens: &[&str]) -> ISupportTable {
        let mut t = ISupportTable::new();
        t.apply(tokens.iter().copied());
        t
    }

    fn parsed(line: &str) -> ParsedMessage {
        let config = Config::default();
        let server = ServerId::new("net");
        let isupport = ISupportTable::new();
        let c = Classifier::new(&isupport, EncodingResolver::new(&config, &server))
            .classify(&latin1_decode(line.as_bytes()));
        ParsedMessage {
            server,
            seq: 1,
            received_at: Utc::now(),
            raw: line.as_bytes().to_vec(),
            source: c.source,
            encoding: c.encoding,
            request: None,
            suppressed: false,
            kind: c.kind,
        }
    }

    fn sends(actions: &[PresenceAction]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                PresenceAction::Send(m) => Some(m.to_string()),
                _ => None,
            })
            .collect()
    }

    fn changes(actions: &[PresenceAction]) -> Vec<(String, bool)> {
        actions
            .iter()
            .filter_map(|a| match a {
                PresenceAction::Changed { nick, online, .. } => Some((nick.clone(), *online)),
                _ => None,
            })
            .collect()
    }

    fn add(t: &mut PresenceTracker, mask: &str) -> Vec<PresenceAction> {
        t.apply(PresenceOp::AddPermanent(UserAddress::parse(mask)))
    }

    #[tokio::test(start_paused = true)]
    async fn ops_queue_until_start() {
        let mut t = PresenceTracker::new();
        assert!(add(&mut t, "alice").is_empty());
        assert!(add(&mut t, "bob").is_empty());
        t.apply(PresenceOp::RemovePermanent(UserAddress::parse("alice")));
        assert!(t.entries().is_empty());

        let out = t.start(&table(&["WATCH=10"]), Instant::now());
        assert_eq!(sends(&out), ["WATCH +bob"]);
        assert_eq!(t.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn startup_burst_is_batched() {
        let mut t = PresenceTracker::new();
        for i in 0..100 {
            add(&mut t, &format!("watcher{:03}", i));
        }
        let out = t.start(&table(&["WATCH=128"]), Instant::now());
        let lines = sends(&out);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= MAX_LINE_PAYLOAD));
        assert!(t.entries().iter().all(|e| e.placement == Placement::Native));
    }

    #[tokio::test(start_paused = true)]
    async fn temporary_and_permanent_share_entry() {
        let mut t = PresenceTracker::new();
        t.start(&table(&["WATCH=10"]), Instant::now());
        let bob = UserAddress::parse("bob");

        assert_eq!(sends(&add(&mut t, "bob")), ["WATCH +bob"]);
        assert!(t.apply(PresenceOp::AddTemporary(bob.clone())).is_empty());
        assert!(t.apply(PresenceOp::RemoveTemporary(bob.clone())).is_empty());
        assert_eq!(t.entries().len(), 1);
        assert_eq!(
            sends(&t.apply(PresenceOp::RemovePermanent(bob))),
            ["WATCH -bob"]
        );
        assert!(t.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn freed_slot_promotes_oldest_polled() {
        let mut t = PresenceTracker::new();
        t.start(&table(&["WATCH=1"]), Instant::now());
        add(&mut t, "a");
        assert!(sends(&add(&mut t, "b")).is_empty());
        add(&mut t, "c");

        let out = t.apply(PresenceOp::RemovePermanent(UserAddress::parse("a")));
        assert_eq!(sends(&out), ["WATCH -a", "WATCH +b"]);
        assert_eq!(t.entries()[0].placement, Placement::Native);
        assert_eq!(t.entries()[1].placement, Placement::Polled);
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_fire_once() {
        let mut t = PresenceTracker::new();
        add(&mut t, "alice");
        t.start(&table(&["WATCH=10"]), Instant::now());

        let on = parsed(":irc.example.net 604 me alice a host.example 0 :is online");
        assert_eq!(changes(&t.feed(&on)), [("alice".to_string(), true)]);
        assert!(t.feed(&on).is_empty());
        assert!(t.feed(&parsed(":alice!a@host.example PRIVMSG #c :hi")).is_empty());

        let quit = parsed(":alice!a@host.example QUIT :bye");
        assert_eq!(changes(&t.feed(&quit)), [("alice".to_string(), false)]);
        let logon = parsed(":irc.example.net 600 me alice a host.example 0 :logged online");
        assert_eq!(changes(&t.feed(&logon)), [("alice".to_string(), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn nick_change_moves_presence() {
        let mut t = PresenceTracker::new();
        add(&mut t, "alice");
        add(&mut t, "alice_away");
        t.start(&table(&[]), Instant::now());

        t.feed(&parsed(":alice!a@h PRIVMSG #c :hi"));
        let out = t.feed(&parsed(":alice!a@h NICK alice_away"));
        assert_eq!(
            changes(&out),
            [("alice".to_string(), false), ("alice_away".to_string(), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wildcard_mask_survives_nick_change() {
        let mut t = PresenceTracker::new();
        add(&mut t, "*!*@h.example");
        t.start(&table(&[]), Instant::now());

        let out = t.feed(&parsed(":alice!a@h.example PRIVMSG #c :hi"));
        assert_eq!(changes(&out), [("alice".to_string(), true)]);
        assert!(t.feed(&parsed(":alice!a@h.example NICK alice2")).is_empty());
        assert_eq!(t.entries()[0].state, PresenceState::Online);

        let out = t.feed(&parsed(":alice2!a@h.example QUIT :bye"));
        assert_eq!(changes(&out), [("alice2".to_string(), false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_ison_reply_stays_aligned() {
        let mut t = PresenceTracker::new();
        add(&mut t, "alice");
        let start = Instant::now();
        t.start(&table(&[]), start);
        assert_eq!(sends(&t.poll(start, "me")), ["ISON alice"]);

        add(&mut t, "bob");
        tokio::time::advance(POLL_INTERVAL).await;
        assert_eq!(sends(&t.poll(Instant::now(), "me")), ["ISON :alice bob"]);

        let first = parsed(":irc.example.net 303 me :alice");
        assert_eq!(changes(&t.feed(&first)), [("alice".to_string(), true)]);
        let second = parsed(":irc.example.net 303 me :alice bob");
        assert_eq!(changes(&t.feed(&second)), [("bob".to_string(), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_ison_batches_are_capped() {
        let mut t = PresenceTracker::new();
        add(&mut t, "alice");
        t.start(&table(&[]), Instant::now());
        for _ in 0..MAX_INFLIGHT + 3 {
            assert_eq!(t.poll(Instant::now(), "me").len(), 1);
            tokio::time::advance(POLL_INTERVAL).await;
        }
        assert_eq!(t.inflight.len(), MAX_INFLIGHT);
    }

    #[tokio::test(start_paused = true)]
    async fn ison_poll_resolves_every_queried_nick() {
        let mut t = PresenceTracker::new();
        add(&mut t, "alice");
        add(&mut t, "Bob");
        add(&mut t, "*!*@*.example.org");
        let start = Instant::now();
        assert!(t.start(&table(&[]), start).is_empty());

        let out = t.poll(start, "me");
        assert_eq!(sends(&out), ["ISON :alice Bob"]);
        assert!(t.poll(start, "me").is_empty());

        let reply = parsed(":irc.example.net 303 me :bob");
        assert_eq!(
            changes(&t.feed(&reply)),
            [("alice".to_string(), false), ("Bob".to_string(), true)]
        );

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(t.poll(Instant::now(), "me").is_empty());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(t.poll(Instant::now(), "me").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_full_demotes_to_polling() {
        let mut t = PresenceTracker::new();
        t.start(&table(&["WATCH=10"]), Instant::now());
        add(&mut t, "carol");
        t.feed(&parsed(":irc.example.net 512 me carol :Maximum size for WATCH-list is 10 entries"));
        assert_eq!(t.entries()[0].placement, Placement::Polled);
    }
}
