//! Sans-IO connection state machine.
//!
//! The machine is fed classified lines and clock ticks and answers with
//! [`Action`]s; it never touches a socket. The async driver in
//! [`crate::network`] owns the I/O.

use std::sync::Arc;
use std::time::Duration;

use slirc_proto::{MAX_LINE_PAYLOAD, RawMessage, Response, irc_eq, strip_formatting};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::nick::{base_nick, next_nick};
use super::{Action, ConnectionState, ServerSession};
use crate::bus::ConnectionEvent;
use crate::context::ServerId;
use crate::error::ClientError;
use crate::event::{MessageKind, ParsedMessage};
use crate::prefs::{Preferences, Reconcile};

/// Silence after end of MOTD before the connection counts as finished.
pub const MOTD_SETTLE: Duration = Duration::from_millis(1000);
/// Silence after nick acceptance before the connection counts as finished.
pub const WELCOME_SETTLE: Duration = Duration::from_millis(5000);
/// Extra keep-alive ticks allowed after the probe before giving up.
pub const PROBE_GRACE_TICKS: u32 = 2;

pub struct SessionMachine {
    session: ServerSession,
    prefs: Arc<dyn Preferences>,
}

impl SessionMachine {
    pub fn new(server: ServerId, prefs: Arc<dyn Preferences>, now: Instant) -> Self {
        let nick = prefs.default_nick();
        Self {
            session: ServerSession::new(server, nick, now),
            prefs,
        }
    }

    pub fn session(&self) -> &ServerSession {
        &self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state
    }

    /// Socket is up: send the registration burst.
    pub fn start(&mut self, now: Instant) -> Vec<Action> {
        let s = &mut self.session;
        s.state = ConnectionState::Registering;
        s.last_line = now;

        let mut actions = vec![Action::Connection(ConnectionEvent::Connected)];
        if let Some(pass) = self.prefs.server_password(&s.server) {
            actions.push(Action::Send(RawMessage::new("PASS", [pass])));
        }
        actions.push(Action::Send(RawMessage::new("NICK", [s.nick.clone()])));
        actions.push(Action::Send(RawMessage::new(
            "USER",
            [
                self.prefs.username(),
                "0".to_string(),
                "*".to_string(),
                self.prefs.realname(),
            ],
        )));
        actions
    }

    /// React to one inbound line.
    pub fn feed(&mut self, msg: &ParsedMessage, now: Instant) -> Vec<Action> {
        self.session.last_line = now;
        self.session.idle_ticks = 0;
        self.learn_own_address(msg);

        match &msg.kind {
            MessageKind::Ping { token } => {
                vec![Action::SendNow(RawMessage::new("PONG", [token.clone()]))]
            }
            MessageKind::Numeric {
                code,
                target,
                params,
            } => self.numeric(*code, target, params),
            MessageKind::Nick { new_nick } => {
                if msg
                    .source_nick()
                    .is_some_and(|old| irc_eq(old, &self.session.nick))
                {
                    debug!(server = %self.session.server, old = %self.session.nick, new = %new_nick, "own nick changed");
                    self.session.nick = new_nick.clone();
                }
                Vec::new()
            }
            MessageKind::Error { message } => {
                self.session.state = ConnectionState::Disconnected;
                let cause = if self.session.quit_requested {
                    None
                } else {
                    Some(ClientError::ServerError(message.clone()))
                };
                vec![Action::Close(cause)]
            }
            _ => Vec::new(),
        }
    }

    fn numeric(&mut self, code: u16, target: &str, params: &[String]) -> Vec<Action> {
        let s = &mut self.session;
        let Some(response) = Response::from_code(code) else {
            return Vec::new();
        };

        match response {
            Response::RPL_WELCOME => {
                s.nick_accepted = true;
                s.nick = target.to_string();
                if s.state == ConnectionState::Registering {
                    s.state = ConnectionState::Active { motd_done: false };
                }
                info!(server = %s.server, nick = %s.nick, "registered");
                vec![Action::Connection(ConnectionEvent::Registered {
                    nick: s.nick.clone(),
                })]
            }
            Response::RPL_ISUPPORT => {
                let mut all = Vec::with_capacity(params.len() + 1);
                all.push(target);
                all.extend(params.iter().map(String::as_str));
                s.isupport.apply_reply(&all);
                Vec::new()
            }
            Response::RPL_MYINFO => self.server_identified(params),
            Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD => self.motd_done(),
            r if r.is_nick_rejection() => self.nick_rejected(params),
            Response::RPL_UNAWAY | Response::RPL_NOWAWAY => {
                let away = response == Response::RPL_NOWAWAY;
                if s.away == away {
                    return Vec::new();
                }
                s.away = away;
                vec![Action::Away(away)]
            }
            _ => Vec::new(),
        }
    }

    fn server_identified(&mut self, params: &[String]) -> Vec<Action> {
        let Some(reported) = params.first() else {
            return Vec::new();
        };
        let host = strip_formatting(reported).into_owned();
        let network = self.session.isupport.network().map(str::to_string);
        self.session.server_host = Some(host.clone());

        let mut actions = vec![Action::Connection(ConnectionEvent::ServerIdentified {
            host: host.clone(),
            network: network.clone(),
        })];
        let decision =
            self.prefs
                .reconcile_server(&self.session.server, &host, network.as_deref());
        if decision == Reconcile::Confirm {
            debug!(server = %self.session.server, host = %host, "server confirmation requested");
            self.session.confirmation_pending = true;
            actions.push(Action::Connection(ConnectionEvent::ConfirmationRequested { host }));
        }
        actions
    }

    fn motd_done(&mut self) -> Vec<Action> {
        let s = &mut self.session;
        s.motd_seen = true;
        if matches!(s.state, ConnectionState::Active { .. }) {
            s.state = ConnectionState::Active { motd_done: true };
        }
        if s.identified {
            return Vec::new();
        }
        s.identified = true;

        let Some(line) = self.prefs.identify_command(&s.nick) else {
            return Vec::new();
        };
        match RawMessage::parse(&line) {
            Ok(msg) => {
                debug!(server = %s.server, nick = %s.nick, "sending identify command");
                vec![Action::Send(msg)]
            }
            Err(e) => {
                warn!(server = %s.server, error = %e, "identify command is not a valid IRC line");
                Vec::new()
            }
        }
    }

    fn nick_rejected(&mut self, params: &[String]) -> Vec<Action> {
        let s = &mut self.session;
        if s.nick_accepted {
            return Vec::new();
        }

        let rejected = params.first().map(String::as_str).unwrap_or(&s.nick);
        let base = s
            .nick_base
            .get_or_insert_with(|| base_nick(rejected).to_string())
            .clone();
        let attempt = s.nick_attempts;
        s.nick_attempts += 1;

        let candidate = next_nick(&base, attempt, s.isupport.nicklen(), &mut rand::thread_rng());
        warn!(server = %s.server, rejected = %rejected, attempt, next = %candidate, "nickname rejected");
        s.nick = candidate.clone();
        vec![Action::Send(RawMessage::new("NICK", [candidate]))]
    }

    fn learn_own_address(&mut self, msg: &ParsedMessage) {
        let Some(source) = &msg.source else {
            return;
        };
        if irc_eq(source.nick(), &self.session.nick) && source.host() != "*" {
            self.session.user = Some(source.user().to_string());
            self.session.host = Some(source.host().to_string());
        }
    }

    /// One keep-alive tick (every 10 s).
    pub fn tick_keepalive(&mut self) -> Vec<Action> {
        let s = &mut self.session;
        if !s.state.is_connected() {
            return Vec::new();
        }
        s.idle_ticks += 1;
        let probe_at = self.prefs.keepalive_ticks(&s.server);

        if s.idle_ticks >= probe_at + PROBE_GRACE_TICKS {
            warn!(server = %s.server, ticks = s.idle_ticks, "keep-alive timeout");
            s.state = ConnectionState::Disconnected;
            return vec![Action::Close(Some(ClientError::PingTimeout {
                ticks: s.idle_ticks,
            }))];
        }
        if s.idle_ticks == probe_at {
            let token = s.server_host.clone().unwrap_or_else(|| s.server.to_string());
            debug!(server = %s.server, "idle, sending keep-alive probe");
            return vec![Action::SendNow(RawMessage::new("PING", [token]))];
        }
        Vec::new()
    }

    /// Finished detection (every 250 ms).
    pub fn tick_finished(&mut self, now: Instant) -> Vec<Action> {
        let s = &mut self.session;
        if !matches!(s.state, ConnectionState::Active { .. }) || s.confirmation_pending {
            return Vec::new();
        }
        let silence = now.saturating_duration_since(s.last_line);
        let settled = (s.motd_seen && silence >= MOTD_SETTLE)
            || (s.nick_accepted && silence >= WELCOME_SETTLE);
        if !settled {
            return Vec::new();
        }
        s.state = ConnectionState::Finished;
        info!(server = %s.server, nick = %s.nick, "connection finished");
        vec![Action::Connection(ConnectionEvent::Finished)]
    }

    /// The user answered a [`ConnectionEvent::ConfirmationRequested`].
    pub fn confirm_server(&mut self) {
        self.session.confirmation_pending = false;
    }

    /// Graceful disconnect.
    pub fn quit(&mut self, message: Option<String>) -> Vec<Action> {
        let s = &mut self.session;
        s.quit_requested = true;
        let mut message = message.unwrap_or_else(|| self.prefs.quit_message());
        truncate_to(&mut message, MAX_LINE_PAYLOAD - "QUIT :".len());
        s.state = ConnectionState::Disconnected;
        vec![
            Action::SendNow(RawMessage::new("QUIT", [message])),
            Action::Close(None),
        ]
    }

    /// Forced disconnect or transport failure.
    pub fn disconnected(&mut self) {
        self.session.state = ConnectionState::Disconnected;
    }
}

/// Cut `s` to at most `max` bytes on a char boundary.
fn truncate_to(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::{Classifier, EncodingResolver};
    use chrono::Utc;
    use slirc_proto::latin1_decode;

    const CONFIG: &str = r##"
[identity]
nick = "foo"
confirm_unknown_servers = true

[[server]]
id = "net"
host = "irc.example.net"
password = "hunter2"

[[identify]]
nick = "foo"
password = "secret"
"##;

    fn machine() -> SessionMachine {
        let config: Config = CONFIG.parse().unwrap();
        SessionMachine::new(ServerId::new("net"), Arc::new(config), Instant::now())
    }

    fn parsed(machine: &SessionMachine, line: &str) -> ParsedMessage {
        let config: Config = CONFIG.parse().unwrap();
        let server = ServerId::new("net");
        let c = Classifier::new(
            &machine.session().isupport,
            EncodingResolver::new(&config, &server),
        )
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

    fn feed(machine: &mut SessionMachine, line: &str) -> Vec<Action> {
        let msg = parsed(machine, line);
        machine.feed(&msg, Instant::now())
    }

    fn sent(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(m) | Action::SendNow(m) => Some(m.to_string()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn registration_burst() {
        let mut m = machine();
        let actions = m.start(Instant::now());
        assert_eq!(
            sent(&actions),
            ["PASS hunter2", "NICK foo", "USER slirc 0 * :Straylight IRC client"]
        );
        assert_eq!(m.state(), ConnectionState::Registering);
    }

    #[tokio::test(start_paused = true)]
    async fn nick_ladder_until_welcome() {
        let mut m = machine();
        m.start(Instant::now());

        let mut tried = Vec::new();
        for _ in 0..4 {
            let line = format!(":irc.example.net 433 * {} :Nickname is already in use", m.session().nick);
            tried.extend(sent(&feed(&mut m, &line)));
        }
        assert_eq!(tried, ["NICK foo_", "NICK foo__", "NICK foo___", "NICK _foo"]);

        feed(&mut m, ":irc.example.net 001 _foo :Welcome");
        assert!(m.session().nick_accepted);
        assert_eq!(m.session().nick, "_foo");

        let after = feed(&mut m, ":irc.example.net 433 _foo bar :Nickname is already in use");
        assert!(after.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ping_answered_immediately() {
        let mut m = machine();
        m.start(Instant::now());
        let actions = feed(&mut m, "PING :irc.example.net");
        assert!(matches!(&actions[..], [Action::SendNow(msg)] if msg.to_string() == "PONG irc.example.net"));
    }

    #[tokio::test(start_paused = true)]
    async fn identify_once_and_finish_after_confirmation() {
        let mut m = machine();
        m.start(Instant::now());
        feed(&mut m, ":irc.example.net 001 foo :Welcome");
        let actions = feed(&mut m, ":irc.example.net 004 foo \x02irc.example.net\x02 ircd-1 iw ov");
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Connection(ConnectionEvent::ServerIdentified { host, .. }) if host == "irc.example.net"
        )));
        // configured host, so nothing to confirm
        assert!(!m.session().confirmation_pending);

        let actions = feed(&mut m, ":irc.example.net 376 foo :End of MOTD");
        assert_eq!(sent(&actions), ["PRIVMSG NickServ :IDENTIFY secret"]);
        assert!(feed(&mut m, ":irc.example.net 422 foo :No MOTD").is_empty());

        assert!(m.tick_finished(Instant::now()).is_empty());
        tokio::time::advance(MOTD_SETTLE).await;
        let actions = m.tick_finished(Instant::now());
        assert!(matches!(&actions[..], [Action::Connection(ConnectionEvent::Finished)]));
        assert!(m.session().is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_defers_finished() {
        let mut m = machine();
        m.start(Instant::now());
        feed(&mut m, ":hub.other.org 001 foo :Welcome");
        let actions = feed(&mut m, ":hub.other.org 004 foo hub.other.org ircd-1 iw ov");
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Connection(ConnectionEvent::ConfirmationRequested { .. })
        )));

        tokio::time::advance(WELCOME_SETTLE).await;
        assert!(m.tick_finished(Instant::now()).is_empty());
        m.confirm_server();
        assert_eq!(m.tick_finished(Instant::now()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn welcome_alone_finishes_after_five_seconds() {
        let mut m = machine();
        m.start(Instant::now());
        feed(&mut m, ":irc.example.net 001 foo :Welcome");
        tokio::time::advance(Duration::from_millis(4750)).await;
        assert!(m.tick_finished(Instant::now()).is_empty());
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(m.tick_finished(Instant::now()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_probe_then_timeout() {
        let mut m = machine();
        m.start(Instant::now());
        for _ in 0..9 {
            assert!(m.tick_keepalive().is_empty());
        }
        assert_eq!(sent(&m.tick_keepalive()), ["PING net"]);
        assert!(m.tick_keepalive().is_empty());
        let actions = m.tick_keepalive();
        assert!(matches!(
            &actions[..],
            [Action::Close(Some(ClientError::PingTimeout { ticks: 12 }))]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn any_line_resets_idle() {
        let mut m = machine();
        m.start(Instant::now());
        for _ in 0..9 {
            m.tick_keepalive();
        }
        feed(&mut m, ":irc.example.net NOTICE foo :still here");
        assert!(m.tick_keepalive().is_empty());
        assert_eq!(m.session().idle_ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn away_from_numerics_only() {
        let mut m = machine();
        m.start(Instant::now());
        let actions = feed(&mut m, ":irc.example.net 306 foo :You have been marked as being away");
        assert!(matches!(&actions[..], [Action::Away(true)]));
        assert!(feed(&mut m, ":irc.example.net 306 foo :again").is_empty());
        let actions = feed(&mut m, ":irc.example.net 305 foo :back");
        assert!(matches!(&actions[..], [Action::Away(false)]));
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_and_quit() {
        let mut m = machine();
        m.start(Instant::now());
        let actions = feed(&mut m, "ERROR :Closing Link: K-lined");
        assert!(matches!(&actions[..], [Action::Close(Some(ClientError::ServerError(_)))]));

        let mut m = machine();
        m.start(Instant::now());
        let actions = m.quit(None);
        assert_eq!(sent(&actions), ["QUIT Leaving"]);
        assert!(matches!(actions.last(), Some(Action::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn long_quit_message_is_cut_to_fit() {
        let mut m = machine();
        m.start(Instant::now());
        let actions = m.quit(Some("é".repeat(400)));
        let lines = sent(&actions);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("QUIT éé"));
        assert!(lines[0].len() <= MAX_LINE_PAYLOAD);
        assert!(matches!(actions.last(), Some(Action::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn isupport_and_own_nick_tracking() {
        let mut m = machine();
        m.start(Instant::now());
        feed(&mut m, ":irc.example.net 001 foo :Welcome");
        feed(&mut m, ":irc.example.net 005 foo WATCH=128 NICKLEN=30 :are supported by this server");
        assert_eq!(m.session().isupport.watch_limit(), 128);

        feed(&mut m, ":foo!~f@home.example NICK :bar");
        assert_eq!(m.session().nick, "bar");
        assert_eq!(m.session().host.as_deref(), Some("home.example"));
        feed(&mut m, ":other!o@h NICK :baz");
        assert_eq!(m.session().nick, "bar");
    }
}
