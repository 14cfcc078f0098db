//! Integration test common infrastructure.
//!
//! Provides an in-memory transport, a scripted server end, and helpers for
//! building engines and reading the event bus.

pub mod server;

#[allow(unused_imports)]
pub use server::{DuplexConnector, MockServer};

use std::sync::Arc;
use std::time::Duration;

use slirc_client::engine::{Engine, EngineContext, Output};
use slirc_client::ignore::IgnoreList;
use slirc_client::{ClientEvent, Config, ParsedMessage, RequestIds, ServerId};
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Config shared by most tests.
#[allow(dead_code)]
pub const CONFIG: &str = r##"
[identity]
nick = "foo"
username = "fu"
realname = "Foo Bar"
quit_message = "gone fishing"

[[server]]
id = "net"
host = "irc.example.net"
"##;

#[allow(dead_code)]
pub fn engine(config: &str) -> Engine {
    let config: Config = config.parse().expect("test config");
    let ctx = EngineContext {
        prefs: Arc::new(config),
        requests: Arc::new(RequestIds::new()),
        ignores: Arc::new(IgnoreList::new()),
    };
    Engine::new(ServerId::new("net"), ctx, Instant::now())
}

/// Outbound lines in `outputs`, as text.
#[allow(dead_code)]
pub fn sent(outputs: &[Output]) -> Vec<String> {
    outputs
        .iter()
        .filter_map(|o| match o {
            Output::Send(b) | Output::SendNow(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        })
        .collect()
}

/// The message event that leads every `handle_line` result.
#[allow(dead_code)]
pub fn message(outputs: &[Output]) -> Arc<ParsedMessage> {
    match outputs.first() {
        Some(Output::Event(ClientEvent::Message(msg))) => msg.clone(),
        other => panic!("expected message event first, got {:?}", other),
    }
}

/// Next bus event matching `pred`, skipping others.
#[allow(dead_code)]
pub async fn next_event<F>(rx: &mut broadcast::Receiver<ClientEvent>, mut pred: F) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(120), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("bus closed");
        if pred(&event) {
            return event;
        }
    }
}
