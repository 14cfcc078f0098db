//! slirc - headless IRC client
//!
//! Connects to every configured server and logs what the engine publishes.

use std::time::Duration;

use slirc_client::{Client, ClientEvent, Config, ConnectionEvent, MessageKind};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    if config.servers.is_empty() {
        return Err(anyhow::anyhow!("no [[server]] blocks in {config_path}"));
    }

    info!(
        nick = %config.identity.nick,
        servers = config.servers.len(),
        "Starting slirc"
    );

    let client = Client::new(config);
    let mut events = client.subscribe();
    let ids: Vec<String> = client.config().servers.iter().map(|s| s.id.clone()).collect();
    for id in &ids {
        client.connect(id)?;
    }

    let mut live = ids.len();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for ctrl-c");
                }
                break;
            }
            event = events.recv() => {
                if next_event(event, &mut live) {
                    return Ok(());
                }
            }
        }
    }

    info!("Shutting down");
    client.quit_all(None);
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while !next_event(events.recv().await, &mut live) {}
    })
    .await;
    if drained.is_err() {
        warn!(remaining = live, "Shutdown grace period elapsed");
    }

    info!("slirc stopped");
    Ok(())
}

/// Consume one bus result. Returns true once nothing is left to wait for.
fn next_event(event: Result<ClientEvent, RecvError>, live: &mut usize) -> bool {
    match event {
        Ok(event) => {
            if log_event(&event) {
                *live = live.saturating_sub(1);
            }
            *live == 0
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Event consumer lagged");
            false
        }
        Err(RecvError::Closed) => true,
    }
}

/// Log one event. Returns true when a connection has ended.
fn log_event(event: &ClientEvent) -> bool {
    match event {
        ClientEvent::Message(msg) => match &msg.kind {
            MessageKind::Unknown { reason } => {
                tracing::debug!(server = %msg.server, seq = msg.seq, %reason, "unhandled line")
            }
            kind => tracing::debug!(server = %msg.server, seq = msg.seq, ?kind, "message"),
        },
        ClientEvent::Connection { server, event } => {
            info!(server = %server, ?event, "connection");
            return matches!(event, ConnectionEvent::Disconnected { .. });
        }
        ClientEvent::Presence {
            server,
            mask,
            nick,
            online,
        } => info!(server = %server, mask = %mask, %nick, online, "presence"),
        ClientEvent::AwayChanged { server, away } => info!(server = %server, away, "away"),
        ClientEvent::IgnoreListChanged | ClientEvent::WatchListChanged => {}
    }
    false
}
