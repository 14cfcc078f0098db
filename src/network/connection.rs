//! Async driver for one server connection.
//!
//! ```text
//!  FramedRead<LineCodec> ──▶ ┌──────────────┐ ──▶ FloodLimiter ──▶ writer task ──▶ FramedWrite
//!  10 s keep-alive tick  ──▶ │    Engine    │ ──▶ EventBus
//!  250 ms finished tick  ──▶ │  (sans-IO)   │
//!  handle commands       ──▶ └──────────────┘
//! ```
//!
//! Exactly one `Disconnected` event is published per run, whatever ends it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use slirc_proto::{LineCodec, MAX_LINE_PAYLOAD, ProtocolError};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{Instrument, debug, info, warn};

use super::transport::{ConnectTarget, Connector};
use crate::bus::{ClientEvent, ConnectionEvent, EventBus};
use crate::context::ServerId;
use crate::engine::{Command, Engine, EngineContext, Output};
use crate::error::ClientError;
use crate::flood::FloodLimiter;
use crate::presence::PresenceOp;
use crate::telemetry::spans;

pub const KEEPALIVE_TICK: Duration = Duration::from_secs(10);
pub const FINISHED_TICK: Duration = Duration::from_millis(250);
/// How long the writer gets to flush after the connection ends.
const WRITER_FLUSH: Duration = Duration::from_secs(5);

/// Messages from handles (and the client's timers) to a running connection.
#[derive(Debug)]
pub enum ConnCommand {
    Engine(Command),
    PresenceTick,
    /// Forced disconnect.
    Close,
}

pub struct ConnectionParams {
    pub server: ServerId,
    pub target: ConnectTarget,
    pub ctx: EngineContext,
    pub bus: EventBus,
    pub connector: Arc<dyn Connector>,
    pub commands: mpsc::UnboundedReceiver<ConnCommand>,
    /// Watch masks replayed once presence tracking starts.
    pub watches: Vec<PresenceOp>,
}

/// Run a connection to completion. Returns the disconnect cause.
pub async fn run(params: ConnectionParams) -> Option<Arc<ClientError>> {
    let span = spans::connection(params.server.as_str(), &params.target.host);
    let server = params.server.clone();
    let bus = params.bus.clone();

    let cause = drive(params).instrument(span).await.map(Arc::new);
    match &cause {
        Some(e) => warn!(server = %server, error = %e, code = e.error_code(), "disconnected"),
        None => info!(server = %server, "disconnected"),
    }
    bus.publish(ClientEvent::Connection {
        server,
        event: ConnectionEvent::Disconnected {
            cause: cause.clone(),
        },
    });
    cause
}

async fn drive(params: ConnectionParams) -> Option<ClientError> {
    let ConnectionParams {
        server,
        target,
        ctx,
        bus,
        connector,
        mut commands,
        watches,
    } = params;

    bus.publish(ClientEvent::Connection {
        server: server.clone(),
        event: ConnectionEvent::Connecting,
    });
    let transport = match connector.connect(&target).await {
        Ok(t) => t,
        Err(e) => return Some(e),
    };
    info!(local = ?transport.local_addr, "connected");

    let (read, write) = tokio::io::split(transport.stream);
    let mut reader = FramedRead::new(read, LineCodec::new());
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let (err_tx, mut err_rx) = oneshot::channel();
    let writer = tokio::spawn(write_loop(FramedWrite::new(write, LineCodec::new()), line_rx, err_tx));
    let limiter = FloodLimiter::new(line_tx);

    let now = Instant::now();
    let mut engine = Engine::new(server, ctx, now);
    for op in watches {
        engine.command(Command::Presence(op), now);
    }
    let mut outputs = engine.start(now);

    let mut keepalive = interval_at(now + KEEPALIVE_TICK, KEEPALIVE_TICK);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut finished = interval(FINISHED_TICK);
    finished.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let cause = loop {
        if let Some(cause) = apply(std::mem::take(&mut outputs), &limiter, &bus) {
            break cause;
        }

        outputs = tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(line)) => engine.handle_line(&line, Instant::now()),
                Some(Err(e)) => break Some(transport_error(e)),
                None if engine.session().quit_requested => break None,
                None => break Some(ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                ))),
            },
            _ = keepalive.tick() => engine.keepalive_tick(),
            _ = finished.tick() => engine.finished_tick(Instant::now()),
            cmd = commands.recv() => match cmd {
                Some(ConnCommand::Engine(command)) => engine.command(command, Instant::now()),
                Some(ConnCommand::PresenceTick) => engine.presence_tick(Instant::now()),
                Some(ConnCommand::Close) | None => break None,
            },
            res = &mut err_rx => break Some(match res {
                Ok(e) => transport_error(e),
                Err(_) => ClientError::SessionClosed,
            }),
        };
    };

    engine.disconnected();
    limiter.abandon();
    drop(limiter);
    if tokio::time::timeout(WRITER_FLUSH, writer).await.is_err() {
        debug!("writer did not flush in time");
    }
    cause
}

/// Carry out engine outputs. Returns `Some(cause)` when the engine asked
/// to close.
fn apply(outputs: Vec<Output>, limiter: &FloodLimiter, bus: &EventBus) -> Option<Option<ClientError>> {
    for output in outputs {
        let result = match output {
            Output::Send(line) | Output::SendNow(line) if line.len() > MAX_LINE_PAYLOAD => {
                warn!(len = line.len(), "dropping oversized outbound line");
                Ok(())
            }
            Output::Send(line) => limiter.send(line),
            Output::SendNow(line) => limiter.send_now(line),
            Output::Event(event) => {
                bus.publish(event);
                Ok(())
            }
            Output::Close(cause) => return Some(cause),
        };
        if let Err(e) = result {
            return Some(Some(e));
        }
    }
    None
}

async fn write_loop<W>(
    mut sink: FramedWrite<W, LineCodec>,
    mut lines: mpsc::UnboundedReceiver<Vec<u8>>,
    err_tx: oneshot::Sender<ProtocolError>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        if let Err(e) = sink.send(line).await {
            let _ = err_tx.send(e);
            return;
        }
    }
    let _ = sink.close().await;
}

fn transport_error(e: ProtocolError) -> ClientError {
    match e {
        ProtocolError::Io(io) => ClientError::Io(io),
        other => ClientError::Protocol(other),
    }
}
