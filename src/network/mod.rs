//! Transport and connection driving.

mod connection;
mod handle;
mod transport;

pub use connection::{ConnCommand, ConnectionParams, FINISHED_TICK, KEEPALIVE_TICK, run};
pub use handle::ConnectionHandle;
pub use transport::{ConnectTarget, Connector, IrcStream, TcpConnector, Transport};
