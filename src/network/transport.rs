//! Byte-stream collaborator.
//!
//! The engine only needs an ordered duplex byte stream. How it is obtained
//! (direct socket, proxy, test double) is up to the [`Connector`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ClientError, ClientResult};

/// A duplex byte stream usable as an IRC transport.
pub trait IrcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IrcStream for T {}

/// Where and how to connect.
#[derive(Clone, Debug)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub timeout: Duration,
}

impl From<&ServerConfig> for ConnectTarget {
    fn from(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            tls: server.tls,
            timeout: Duration::from_secs(server.connect_timeout_secs),
        }
    }
}

/// An established transport.
pub struct Transport {
    pub stream: Box<dyn IrcStream>,
    pub local_addr: Option<SocketAddr>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> ClientResult<Transport>;
}

/// Direct TCP, with TLS against the platform's root certificates.
#[derive(Debug, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &ConnectTarget) -> ClientResult<Transport> {
        let addr = (target.host.as_str(), target.port);
        let tcp = tokio::time::timeout(target.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                host: target.host.clone(),
                port: target.port,
                secs: target.timeout.as_secs(),
            })??;
        tcp.set_nodelay(true)?;
        let local_addr = tcp.local_addr().ok();

        if !target.tls {
            return Ok(Transport {
                stream: Box::new(tcp),
                local_addr,
            });
        }

        let tls = upgrade_to_tls(tcp, &target.host).await?;
        Ok(Transport {
            stream: Box::new(tls),
            local_addr,
        })
    }
}

async fn upgrade_to_tls(
    tcp: TcpStream,
    hostname: &str,
) -> ClientResult<tokio_rustls::client::TlsStream<TcpStream>> {
    use tokio_rustls::TlsConnector;
    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};

    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| ClientError::Tls(e.to_string()))?;

    let stream = connector.connect(server_name, tcp).await?;
    info!(hostname = %hostname, "TLS handshake completed");
    Ok(stream)
}
