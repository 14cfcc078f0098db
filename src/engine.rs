//! Sans-IO protocol engine for one connection.
//!
//! Each inbound line runs through a fixed pipeline: classify, stamp the
//! correlated request, apply ignores, then let the session machine, the ban
//! helper and the presence tracker react. The message event is always
//! published before anything derived from it.

use std::sync::Arc;

use chrono::Utc;
use encoding_rs::Encoding;
use slirc_proto::{MAX_LINE_PAYLOAD, RawMessage, UserAddress, latin1_decode};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::ban::BanTracker;
use crate::bus::ClientEvent;
use crate::context::{RequestId, RequestIds, ServerId};
use crate::correlator::Correlator;
use crate::error::ClientError;
use crate::event::{Classifier, EncodingResolver, MessageKind, ParsedMessage, encode_text};
use crate::ignore::{IgnoreList, SilenceMirror};
use crate::prefs::Preferences;
use crate::presence::{PresenceAction, PresenceOp, PresenceTracker};
use crate::session::{Action, ConnectionState, ServerSession, SessionMachine};

/// What the driver must do next.
#[derive(Debug)]
pub enum Output {
    /// Write through flood control.
    Send(Vec<u8>),
    /// Write ahead of the flood backlog.
    SendNow(Vec<u8>),
    Event(ClientEvent),
    /// Close the connection. `None` means we asked for it.
    Close(Option<ClientError>),
}

/// Requests from a connection handle.
#[derive(Clone, Debug)]
pub enum Command {
    Send(RawMessage),
    /// WHO with a pre-allocated tracking id.
    Who { mask: String, id: RequestId },
    Ban { channel: String, nick: String },
    Presence(PresenceOp),
    /// A mask left the global ignore list.
    Unignored(UserAddress),
    ConfirmServer,
    Quit(Option<String>),
}

/// Process-wide collaborators shared by every engine.
#[derive(Clone)]
pub struct EngineContext {
    pub prefs: Arc<dyn Preferences>,
    pub requests: Arc<RequestIds>,
    pub ignores: Arc<IgnoreList>,
}

pub struct Engine {
    server: ServerId,
    seq: u64,
    ctx: EngineContext,
    machine: SessionMachine,
    correlator: Correlator,
    presence: PresenceTracker,
    silence: SilenceMirror,
    bans: BanTracker,
}

impl Engine {
    pub fn new(server: ServerId, ctx: EngineContext, now: Instant) -> Self {
        let machine = SessionMachine::new(server.clone(), ctx.prefs.clone(), now);
        Self {
            server,
            seq: 0,
            ctx,
            machine,
            correlator: Correlator::new(),
            presence: PresenceTracker::new(),
            silence: SilenceMirror::new(),
            bans: BanTracker::new(),
        }
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn session(&self) -> &ServerSession {
        self.machine.session()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn silence(&self) -> &SilenceMirror {
        &self.silence
    }

    /// Socket is up.
    pub fn start(&mut self, now: Instant) -> Vec<Output> {
        let actions = self.machine.start(now);
        self.actions(actions)
    }

    /// Process one inbound line (without CR/LF).
    pub fn handle_line(&mut self, raw: &[u8], now: Instant) -> Vec<Output> {
        self.seq += 1;
        let line = latin1_decode(raw);

        let (classified, casemap, silence_limit) = {
            let isupport = &self.machine.session().isupport;
            let resolver = EncodingResolver::new(self.ctx.prefs.as_ref(), &self.server);
            let classified = Classifier::new(isupport, resolver).classify(&line);
            (classified, isupport.casemapping(), isupport.silence_limit())
        };

        let mut msg = ParsedMessage {
            server: self.server.clone(),
            seq: self.seq,
            received_at: Utc::now(),
            raw: raw.to_vec(),
            source: classified.source,
            encoding: classified.encoding,
            request: None,
            suppressed: false,
            kind: classified.kind,
        };
        trace!(seq = msg.seq, kind = msg.kind.label(), "inbound");
        if let MessageKind::Unknown { reason } = &msg.kind {
            debug!(server = %self.server, reason = %reason, line = %line, "unclassified line");
        }

        if let Some(code) = msg.numeric() {
            msg.request = self.correlator.stamp(code);
        }

        let mut derived = Vec::new();

        if msg.kind.is_suppressible() {
            let ignored = msg
                .source
                .as_ref()
                .and_then(|source| self.ctx.ignores.matching(source, casemap));
            if let Some(mask) = ignored {
                msg.suppressed = true;
                for silence in self.silence.on_suppressed(&mask, silence_limit, now) {
                    derived.push(Output::Send(self.encode(&silence)));
                }
            }
        }
        if let MessageKind::Silence { sign, mask } = &msg.kind {
            self.silence.on_echo(*sign, &UserAddress::parse(mask), now);
        }

        let actions = self.machine.feed(&msg, now);
        derived.extend(self.actions(actions));

        for ban in self.bans.feed(&msg, casemap, now) {
            derived.push(Output::Send(self.encode(&ban)));
        }

        let presence = self.presence.feed(&msg);
        derived.extend(self.presence_outputs(presence));

        let mut out = Vec::with_capacity(derived.len() + 1);
        out.push(Output::Event(ClientEvent::Message(Arc::new(msg))));
        out.extend(derived);
        out
    }

    /// 10 s keep-alive tick.
    pub fn keepalive_tick(&mut self) -> Vec<Output> {
        let actions = self.machine.tick_keepalive();
        self.actions(actions)
    }

    /// 250 ms finished-detection tick. Starts presence tracking once the
    /// connection is finished.
    pub fn finished_tick(&mut self, now: Instant) -> Vec<Output> {
        let actions = self.machine.tick_finished(now);
        let mut out = self.actions(actions);
        if self.machine.state() == ConnectionState::Finished && !self.presence.is_started() {
            let started = self.presence.start(&self.machine.session().isupport, now);
            out.extend(self.presence_outputs(started));
        }
        out
    }

    /// 15 s global presence tick.
    pub fn presence_tick(&mut self, now: Instant) -> Vec<Output> {
        self.bans.expire(now);
        let nick = self.machine.session().nick.clone();
        let polled = self.presence.poll(now, &nick);
        self.presence_outputs(polled)
    }

    pub fn command(&mut self, command: Command, now: Instant) -> Vec<Output> {
        match command {
            Command::Send(msg) => {
                let line = self.encode(&msg);
                if !fits(&line) {
                    return Vec::new();
                }
                if self.correlator.family_of(&msg.command).is_some() {
                    let id = self.ctx.requests.allocate();
                    self.correlator.track(&msg.command, id);
                }
                vec![Output::Send(line)]
            }
            Command::Who { mask, id } => {
                let line = self.encode(&RawMessage::new("WHO", [mask]));
                if !fits(&line) {
                    return Vec::new();
                }
                self.correlator.track("WHO", id);
                vec![Output::Send(line)]
            }
            Command::Ban { channel, nick } => {
                let query = self.bans.request(&channel, &nick, now);
                vec![Output::Send(self.encode(&query))]
            }
            Command::Presence(op) => {
                let actions = self.presence.apply(op);
                self.presence_outputs(actions)
            }
            Command::Unignored(mask) => self
                .silence
                .on_unignored(&mask)
                .map(|msg| Output::Send(self.encode(&msg)))
                .into_iter()
                .collect(),
            Command::ConfirmServer => {
                self.machine.confirm_server();
                Vec::new()
            }
            Command::Quit(message) => {
                let actions = self.machine.quit(message);
                self.actions(actions)
            }
        }
    }

    /// The transport is gone.
    pub fn disconnected(&mut self) {
        self.machine.disconnected();
    }

    fn actions(&self, actions: Vec<Action>) -> Vec<Output> {
        actions
            .into_iter()
            .map(|action| match action {
                Action::Send(msg) => Output::Send(self.encode(&msg)),
                Action::SendNow(msg) => Output::SendNow(self.encode(&msg)),
                Action::Connection(event) => Output::Event(ClientEvent::Connection {
                    server: self.server.clone(),
                    event,
                }),
                Action::Away(away) => Output::Event(ClientEvent::AwayChanged {
                    server: self.server.clone(),
                    away,
                }),
                Action::Close(cause) => Output::Close(cause),
            })
            .collect()
    }

    fn presence_outputs(&self, actions: Vec<PresenceAction>) -> Vec<Output> {
        actions
            .into_iter()
            .map(|action| match action {
                PresenceAction::Send(msg) => Output::Send(self.encode(&msg)),
                PresenceAction::Changed { mask, nick, online } => {
                    Output::Event(ClientEvent::Presence {
                        server: self.server.clone(),
                        mask,
                        nick,
                        online,
                    })
                }
            })
            .collect()
    }

    /// Serialize an outbound message in the encoding of its target.
    pub fn encode(&self, msg: &RawMessage) -> Vec<u8> {
        encode_text(&msg.to_string(), self.outbound_encoding(msg))
    }

    fn outbound_encoding(&self, msg: &RawMessage) -> &'static Encoding {
        let isupport = &self.machine.session().isupport;
        let resolver = EncodingResolver::new(self.ctx.prefs.as_ref(), &self.server);
        let command = msg.command_upper();
        let target = match command.as_str() {
            "PRIVMSG" | "NOTICE" | "TOPIC" | "PART" | "KICK" => msg.param(0),
            _ => None,
        };
        let Some(target) = target else {
            return resolver.server_level();
        };

        let (_, bare) = isupport.split_status_target(target);
        if isupport.is_channel(bare) {
            resolver.resolve(None, Some(bare))
        } else {
            resolver.resolve(Some(&UserAddress::new(bare, "", "")), None)
        }
    }
}

/// Oversized lines are dropped before anything is tracked for them.
fn fits(line: &[u8]) -> bool {
    if line.len() > MAX_LINE_PAYLOAD {
        warn!(len = line.len(), "dropping oversized outbound line");
        return false;
    }
    true
}
