//! Pure classification from one raw line to a [`MessageKind`].
//!
//! Target classification (channel vs user, `STATUSMSG` prefixes) and mode
//! parameter consumption are driven by the connection's ISUPPORT table.

use encoding_rs::Encoding;
use slirc_proto::{
    Ctcp, ISupportTable, MessageParseError, RawMessage, Sign, UserAddress, parse_channel_modes,
    parse_user_modes,
};

use super::MessageKind;
use super::encoding::{EncodingResolver, decode_text};

/// Result of classifying one line.
#[derive(Debug)]
pub struct Classified {
    pub source: Option<UserAddress>,
    pub encoding: &'static Encoding,
    pub kind: MessageKind,
}

/// Classifier bound to one connection's ISUPPORT table and encodings.
pub struct Classifier<'a> {
    isupport: &'a ISupportTable,
    resolver: EncodingResolver<'a>,
}

impl<'a> Classifier<'a> {
    pub fn new(isupport: &'a ISupportTable, resolver: EncodingResolver<'a>) -> Self {
        Self { isupport, resolver }
    }

    /// Classify one line given in its latin1 view. Never fails: anything
    /// that cannot be understood becomes [`MessageKind::Unknown`].
    pub fn classify(&self, line: &str) -> Classified {
        let ident_enc = self.resolver.server_level();

        let raw = match RawMessage::parse(line) {
            Ok(raw) => raw,
            Err(e) => return unknown(None, ident_enc, &e),
        };

        let source = raw
            .prefix
            .as_deref()
            .filter(|p| !UserAddress::is_server_name(p))
            .map(|p| UserAddress::parse(&decode_text(p, ident_enc)));

        match self.kind(&raw, source.as_ref(), ident_enc) {
            Ok((encoding, kind)) => Classified {
                source,
                encoding,
                kind,
            },
            Err(e) => unknown(source, ident_enc, &e),
        }
    }

    fn kind(
        &self,
        raw: &RawMessage,
        source: Option<&UserAddress>,
        ident_enc: &'static Encoding,
    ) -> Result<(&'static Encoding, MessageKind), MessageParseError> {
        let ident = |i: usize| decode_text(&raw.params[i], ident_enc);
        let ident_opt = |i: usize| raw.params.get(i).map(|p| decode_text(p, ident_enc));

        if let Some(code) = raw.numeric() {
            if raw.prefix.is_none() {
                return Err(MessageParseError::NumericWithoutPrefix(raw.command.clone()));
            }
            raw.require_params(1)?;
            let params = raw.params[1..]
                .iter()
                .map(|p| decode_text(p, ident_enc))
                .collect();
            return Ok((
                ident_enc,
                MessageKind::Numeric {
                    code,
                    target: ident(0),
                    params,
                },
            ));
        }

        let command = raw.command_upper();
        let kind = match command.as_str() {
            "PRIVMSG" | "NOTICE" => {
                raw.require_params(2)?;
                return Ok(self.message(raw, source, command == "NOTICE", ident_enc));
            }
            "MODE" => {
                raw.require_params(2)?;
                let target = ident(0);
                if self.isupport.is_channel(&target) {
                    let changes = parse_channel_modes(&raw.params[1..], self.isupport)
                        .map_err(|e| mode_error(raw, e))?;
                    MessageKind::ChannelModeChange {
                        channel: target,
                        changes,
                    }
                } else {
                    let changes =
                        parse_user_modes(&raw.params[1]).map_err(|e| mode_error(raw, e))?;
                    MessageKind::UserModeChange {
                        nick: target,
                        changes,
                    }
                }
            }
            "JOIN" => {
                raw.require_params(1)?;
                MessageKind::Join { channel: ident(0) }
            }
            "PART" => {
                raw.require_params(1)?;
                let channel = ident(0);
                let enc = self.resolver.resolve(source, Some(&channel));
                let reason = raw.params.get(1).map(|p| decode_text(p, enc));
                return Ok((enc, MessageKind::Part { channel, reason }));
            }
            "KICK" => {
                raw.require_params(2)?;
                let channel = ident(0);
                let enc = self.resolver.resolve(source, Some(&channel));
                let reason = raw.params.get(2).map(|p| decode_text(p, enc));
                return Ok((
                    enc,
                    MessageKind::Kick {
                        channel,
                        nick: ident(1),
                        reason,
                    },
                ));
            }
            "TOPIC" => {
                raw.require_params(2)?;
                let channel = ident(0);
                let enc = self.resolver.resolve(source, Some(&channel));
                let topic = decode_text(&raw.params[1], enc);
                return Ok((enc, MessageKind::Topic { channel, topic }));
            }
            "INVITE" => {
                raw.require_params(2)?;
                MessageKind::Invite {
                    nick: ident(0),
                    channel: ident(1),
                }
            }
            "NICK" => {
                raw.require_params(1)?;
                MessageKind::Nick { new_nick: ident(0) }
            }
            "QUIT" => {
                let enc = self.resolver.resolve(source, None);
                let reason = raw.params.first().map(|p| decode_text(p, enc));
                return Ok((enc, MessageKind::Quit { reason }));
            }
            "SILENCE" => {
                raw.require_params(1)?;
                let entry = ident(raw.params.len() - 1);
                let (sign, mask) = match entry.strip_prefix('-') {
                    Some(mask) => (Sign::Minus, mask.to_string()),
                    None => (Sign::Plus, entry.trim_start_matches('+').to_string()),
                };
                MessageKind::Silence { sign, mask }
            }
            "PING" => MessageKind::Ping {
                token: raw.trailing().map(str::to_string).unwrap_or_default(),
            },
            "PONG" => MessageKind::Pong {
                token: raw.trailing().map(str::to_string),
            },
            "ERROR" => MessageKind::Error {
                message: ident_opt(0).unwrap_or_default(),
            },
            _ => MessageKind::Unknown {
                reason: format!("unhandled command {}", raw.command),
            },
        };

        Ok((self.resolver.resolve(source, kind.channel()), kind))
    }

    fn message(
        &self,
        raw: &RawMessage,
        source: Option<&UserAddress>,
        notice: bool,
        ident_enc: &'static Encoding,
    ) -> (&'static Encoding, MessageKind) {
        let target = decode_text(&raw.params[0], ident_enc);
        let (status, bare) = self.isupport.split_status_target(&target);
        let channel = self.isupport.is_channel(bare).then(|| bare.to_string());

        let enc = self.resolver.resolve(source, channel.as_deref());
        let text = &raw.params[1];

        let kind = match (Ctcp::parse(text), channel) {
            (Some(ctcp), Some(channel)) => {
                let payload = ctcp.payload.map(|p| decode_text(p, enc));
                if notice {
                    MessageKind::ChannelCtcpResponse {
                        channel,
                        command: ctcp.command.to_string(),
                        payload,
                    }
                } else if ctcp.is_action() {
                    MessageKind::ChannelAction {
                        channel,
                        text: payload.unwrap_or_default(),
                    }
                } else {
                    MessageKind::ChannelCtcpRequest {
                        channel,
                        command: ctcp.command.to_string(),
                        payload,
                    }
                }
            }
            (Some(ctcp), None) => {
                let payload = ctcp.payload.map(|p| decode_text(p, enc));
                match (notice, ctcp.is_action()) {
                    (true, _) => MessageKind::UserCtcpResponse {
                        target,
                        command: ctcp.command.to_string(),
                        payload,
                    },
                    (false, true) => MessageKind::UserAction {
                        target,
                        text: payload.unwrap_or_default(),
                    },
                    (false, false) => MessageKind::UserCtcpRequest {
                        target,
                        command: ctcp.command.to_string(),
                        payload,
                    },
                }
            }
            (_, Some(channel)) => {
                let text = decode_text(text, enc);
                if notice {
                    MessageKind::ChannelNotice {
                        channel,
                        status,
                        text,
                    }
                } else {
                    MessageKind::ChannelMessage { channel, text }
                }
            }
            (None, None) => {
                let text = decode_text(text, enc);
                if notice {
                    MessageKind::UserNotice { target, text }
                } else {
                    MessageKind::UserMessage { target, text }
                }
            }
        };

        (enc, kind)
    }
}

fn mode_error(raw: &RawMessage, e: slirc_proto::ModeParseError) -> MessageParseError {
    MessageParseError::ParseContext {
        position: 0,
        context: format!("{} mode string: {}", raw.command, e),
    }
}

fn unknown(
    source: Option<UserAddress>,
    encoding: &'static Encoding,
    err: &MessageParseError,
) -> Classified {
    Classified {
        source,
        encoding,
        kind: MessageKind::Unknown {
            reason: err.to_string(),
        },
    }
}
