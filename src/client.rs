//! Multi-server client facade.
//!
//! A [`Client`] owns the process-wide pieces (configuration, request ids,
//! the event bus, the ignore and watch lists) and one [`ConnectionHandle`]
//! per running connection. It also drives the shared presence timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use slirc_proto::UserAddress;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::{ClientEvent, EventBus};
use crate::config::{Config, ServerConfig};
use crate::context::{RequestIds, ServerId};
use crate::engine::EngineContext;
use crate::error::{ClientError, ClientResult};
use crate::ignore::{IgnoreEntry, IgnoreList};
use crate::network::{
    ConnectTarget, ConnectionHandle, ConnectionParams, Connector, TcpConnector, run,
};
use crate::presence::PresenceOp;

/// Presence polling and ban expiry cadence for every connection.
pub const PRESENCE_TICK: Duration = Duration::from_secs(15);

struct Shared {
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    requests: Arc<RequestIds>,
    bus: EventBus,
    ignores: Arc<IgnoreList>,
    watches: Mutex<Vec<UserAddress>>,
    connections: DashMap<ServerId, ConnectionHandle>,
    presence_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.presence_timer.lock().take() {
            timer.abort();
        }
    }
}

#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    /// Use a custom transport, e.g. an in-memory stream in tests.
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Self {
        let ignores = Arc::new(IgnoreList::from_masks(&config.ignore));
        let mut watches: Vec<UserAddress> = Vec::new();
        for mask in &config.watch {
            let mask = UserAddress::parse(mask);
            if !watches.contains(&mask) {
                watches.push(mask);
            }
        }
        Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                connector,
                requests: Arc::new(RequestIds::new()),
                bus: EventBus::new(),
                ignores,
                watches: Mutex::new(watches),
                connections: DashMap::new(),
                presence_timer: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.bus.subscribe()
    }

    /// Connect to a configured server by id.
    pub fn connect(&self, id: &str) -> ClientResult<ConnectionHandle> {
        let server = self
            .shared
            .config
            .server(id)
            .cloned()
            .ok_or_else(|| ClientError::UnknownServer(id.to_string()))?;
        self.connect_to(server)
    }

    /// Connect to an explicit server block. A live connection with the
    /// same id is returned as is.
    pub fn connect_to(&self, server: ServerConfig) -> ClientResult<ConnectionHandle> {
        let id = ServerId::new(&server.id);
        if let Some(existing) = self.connection(id.as_str()) {
            return Ok(existing);
        }
        self.ensure_presence_timer();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(id.clone(), tx, self.shared.requests.clone());
        self.shared.connections.insert(id.clone(), handle.clone());

        let watches = self
            .shared
            .watches
            .lock()
            .iter()
            .cloned()
            .map(PresenceOp::AddPermanent)
            .collect();
        let params = ConnectionParams {
            server: id.clone(),
            target: ConnectTarget::from(&server),
            ctx: EngineContext {
                prefs: self.shared.config.clone(),
                requests: self.shared.requests.clone(),
                ignores: self.shared.ignores.clone(),
            },
            bus: self.shared.bus.clone(),
            connector: self.shared.connector.clone(),
            commands: rx,
            watches,
        };

        info!(server = %id, host = %server.host, port = server.port, "starting connection");
        let shared = self.shared.clone();
        let own = handle.clone();
        tokio::spawn(async move {
            run(params).await;
            shared
                .connections
                .remove_if(&id, |_, current| current.same_connection(&own));
        });
        Ok(handle)
    }

    /// Handle for a running connection.
    pub fn connection(&self, id: &str) -> Option<ConnectionHandle> {
        self.shared
            .connections
            .get(&ServerId::new(id))
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    pub fn connections(&self) -> Vec<ConnectionHandle> {
        self.shared
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Watch a mask on every connection, now and in future.
    pub fn watch(&self, mask: &str) -> bool {
        let mask = UserAddress::parse(mask);
        {
            let mut watches = self.shared.watches.lock();
            if watches.contains(&mask) {
                return false;
            }
            watches.push(mask.clone());
        }
        self.broadcast_presence(PresenceOp::AddPermanent(mask));
        self.shared.bus.publish(ClientEvent::WatchListChanged);
        true
    }

    pub fn unwatch(&self, mask: &str) -> bool {
        let mask = UserAddress::parse(mask);
        {
            let mut watches = self.shared.watches.lock();
            let before = watches.len();
            watches.retain(|m| m != &mask);
            if watches.len() == before {
                return false;
            }
        }
        self.broadcast_presence(PresenceOp::RemovePermanent(mask));
        self.shared.bus.publish(ClientEvent::WatchListChanged);
        true
    }

    pub fn watch_list(&self) -> Vec<UserAddress> {
        self.shared.watches.lock().clone()
    }

    fn broadcast_presence(&self, op: PresenceOp) {
        for handle in self.connections() {
            if let Err(e) = handle.presence(op.clone()) {
                debug!(server = %handle.server(), error = %e, "presence update not delivered");
            }
        }
    }

    /// Suppress messages from a mask. Takes effect on the next line.
    pub fn ignore(&self, mask: &str) -> bool {
        let added = self.shared.ignores.add(UserAddress::parse(mask));
        if added {
            self.shared.bus.publish(ClientEvent::IgnoreListChanged);
        }
        added
    }

    /// Stop ignoring a mask and lift any server-side silence for it.
    pub fn unignore(&self, mask: &str) -> bool {
        let mask = UserAddress::parse(mask);
        if !self.shared.ignores.remove(&mask) {
            return false;
        }
        for handle in self.connections() {
            if let Err(e) = handle.unignored(mask.clone()) {
                debug!(server = %handle.server(), error = %e, "unsilence not delivered");
            }
        }
        self.shared.bus.publish(ClientEvent::IgnoreListChanged);
        true
    }

    pub fn ignore_list(&self) -> Vec<IgnoreEntry> {
        self.shared.ignores.snapshot()
    }

    /// Gracefully quit every connection.
    pub fn quit_all(&self, message: Option<&str>) {
        for handle in self.connections() {
            if let Err(e) = handle.quit(message) {
                debug!(server = %handle.server(), error = %e, "quit not delivered");
            }
        }
    }

    fn ensure_presence_timer(&self) {
        let mut timer = self.shared.presence_timer.lock();
        if timer.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.shared);
        *timer = Some(tokio::spawn(presence_timer(weak)));
    }
}

async fn presence_timer(shared: Weak<Shared>) {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + PRESENCE_TICK,
        PRESENCE_TICK,
    );
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        for entry in shared.connections.iter() {
            // A closed connection is removed by its own task.
            let _ = entry.value().presence_tick();
        }
    }
}
