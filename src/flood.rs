//! Outbound flood control.
//!
//! A leaky bucket: every write adds one credit, one credit leaks away per
//! [`DRAIN_INTERVAL`]. Lines go straight to the writer while fewer than
//! [`BURST`] credits are outstanding; after that they are queued and a
//! drain task releases one line per interval until the queue is empty.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{ClientError, ClientResult};

pub const DRAIN_INTERVAL: Duration = Duration::from_millis(2000);
pub const BURST: u32 = 5;

#[derive(Debug)]
struct State {
    credits: u32,
    last_decay: Instant,
    queue: VecDeque<Vec<u8>>,
    draining: bool,
}

impl State {
    fn decay(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_decay);
        let steps = (elapsed.as_millis() / DRAIN_INTERVAL.as_millis()) as u32;
        self.credits = self.credits.saturating_sub(steps);
        self.last_decay += DRAIN_INTERVAL * steps;
        if self.credits == 0 {
            self.last_decay = now;
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    sink: mpsc::UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
}

/// Rate limiter in front of one connection's writer.
#[derive(Clone, Debug)]
pub struct FloodLimiter {
    inner: Arc<Inner>,
}

impl FloodLimiter {
    /// `sink` receives encoded lines (without CRLF) in wire order.
    pub fn new(sink: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    credits: 0,
                    last_decay: Instant::now(),
                    queue: VecDeque::new(),
                    draining: false,
                }),
                sink,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Send a line, or queue it behind the backlog. Never blocks.
    pub fn send(&self, line: Vec<u8>) -> ClientResult<()> {
        if self.inner.cancel.is_cancelled() {
            return Err(ClientError::SessionClosed);
        }

        let mut state = self.inner.state.lock();
        state.decay(Instant::now());

        if state.queue.is_empty() && !state.draining && state.credits < BURST {
            state.credits += 1;
            return self.write(line);
        }

        state.queue.push_back(line);
        trace!(backlog = state.queue.len(), "line queued by flood control");
        if !state.draining {
            state.draining = true;
            debug!("flood backlog started");
            tokio::spawn(drain(self.inner.clone()));
        }
        Ok(())
    }

    /// Write immediately, ahead of any backlog. Still counts toward credits.
    pub fn send_now(&self, line: Vec<u8>) -> ClientResult<()> {
        let mut state = self.inner.state.lock();
        state.decay(Instant::now());
        state.credits += 1;
        self.write(line)
    }

    /// Lines waiting in the backlog.
    pub fn backlog(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Drop the backlog and stop the drain task.
    pub fn abandon(&self) {
        self.inner.cancel.cancel();
        let dropped = {
            let mut state = self.inner.state.lock();
            let n = state.queue.len();
            state.queue.clear();
            n
        };
        if dropped > 0 {
            debug!(dropped, "flood backlog abandoned");
        }
    }

    fn write(&self, line: Vec<u8>) -> ClientResult<()> {
        self.inner
            .sink
            .send(line)
            .map_err(|_| ClientError::SessionClosed)
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = tokio::time::sleep(DRAIN_INTERVAL) => {}
        }

        let mut state = inner.state.lock();
        let Some(line) = state.queue.pop_front() else {
            state.draining = false;
            debug!("flood backlog drained");
            return;
        };
        state.decay(Instant::now());
        state.credits += 1;
        if inner.sink.send(line).is_err() {
            state.queue.clear();
            break;
        }
    }
    inner.state.lock().draining = false;
}
