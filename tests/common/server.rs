//! Scripted server end of an in-memory connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use slirc_client::ClientResult;
use slirc_client::network::{ConnectTarget, Connector, Transport};
use slirc_proto::LineCodec;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};

const BUFFER: usize = 64 * 1024;

/// Hands each connect attempt an in-memory stream and passes the far end
/// to the test as a [`MockServer`].
pub struct DuplexConnector {
    accepted: mpsc::UnboundedSender<MockServer>,
}

impl DuplexConnector {
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<MockServer>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (Self { accepted }, rx)
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self, _target: &ConnectTarget) -> ClientResult<Transport> {
        let (client, server) = tokio::io::duplex(BUFFER);
        let (read, write) = tokio::io::split(server);
        let _ = self.accepted.send(MockServer {
            reader: FramedRead::new(read, LineCodec::new()),
            writer: FramedWrite::new(write, LineCodec::new()),
        });
        Ok(Transport {
            stream: Box::new(client),
            local_addr: None,
        })
    }
}

/// The server side of one connection.
pub struct MockServer {
    reader: FramedRead<ReadHalf<DuplexStream>, LineCodec>,
    writer: FramedWrite<WriteHalf<DuplexStream>, LineCodec>,
}

#[allow(dead_code)]
impl MockServer {
    /// Send one line to the client.
    pub async fn send(&mut self, line: &str) {
        self.writer
            .send(line.as_bytes().to_vec())
            .await
            .expect("client hung up");
    }

    /// Next line from the client.
    pub async fn recv(&mut self) -> String {
        self.recv_timeout(Duration::from_secs(60))
            .await
            .expect("no line from client")
    }

    /// Next line from the client, or `None` on timeout or EOF.
    pub async fn recv_timeout(&mut self, dur: Duration) -> Option<String> {
        match timeout(dur, self.reader.next()).await {
            Ok(Some(Ok(line))) => Some(String::from_utf8_lossy(&line).into_owned()),
            _ => None,
        }
    }

    /// Read lines until one starts with `prefix`.
    pub async fn recv_until(&mut self, prefix: &str) -> String {
        loop {
            let line = self.recv().await;
            if line.starts_with(prefix) {
                return line;
            }
        }
    }

    /// Consume the registration burst and welcome `nick`.
    pub async fn register(&mut self, nick: &str) {
        self.recv_until("USER ").await;
        self.send(&format!(":irc.example.net 001 {nick} :Welcome")).await;
    }

    /// True once the client has closed its side.
    pub async fn closed(&mut self) -> bool {
        loop {
            match timeout(Duration::from_secs(60), self.reader.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }
}
