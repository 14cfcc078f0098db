//! # slirc-client
//!
//! Client-side IRC protocol engine: registration and keep-alive state
//! machine, flood-controlled output, reply correlation, presence tracking,
//! ignore lists mirrored to server-side SILENCE, and per-scope character
//! encodings. Transport and UI are pluggable; everything the engine learns
//! is published on one [`EventBus`].

pub mod ban;
pub mod bus;
pub mod client;
pub mod config;
pub mod context;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod event;
pub mod flood;
pub mod ignore;
pub mod network;
pub mod prefs;
pub mod presence;
pub mod session;
pub mod telemetry;

pub use bus::{ClientEvent, ConnectionEvent, EventBus};
pub use client::Client;
pub use config::Config;
pub use context::{RequestId, RequestIds, ServerId};
pub use error::{ClientError, ClientResult};
pub use event::{MessageKind, ParsedMessage};
pub use network::{ConnectTarget, ConnectionHandle, Connector, TcpConnector, Transport};
pub use prefs::{EncodingScope, Preferences, Reconcile};
