//! Client socket configuration.
//!
//! Provides [`SocketConfig`] to encapsulate the TCP options applied to the
//! bridge connection right after it is established, and [`connect`] to open
//! and configure that connection in one step.

use std::net::TcpStream;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

/// TCP socket options applied to the client connection.
///
/// The transport itself has no timeouts: a dead peer is only noticed through
/// failed or zero-byte I/O. Keepalive is therefore off unless asked
/// for.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm for lower latency. Default: true.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive. Default: false.
    pub keepalive_enabled: bool,
    /// Idle time before the first keepalive packet. Default: 60s.
    pub keepalive_idle: Duration,
    /// Interval between keepalive packets. Default: 10s.
    pub keepalive_interval: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: false,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
        }
    }
}

/// Apply socket configuration to a connected [`TcpStream`].
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);
        SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}

/// Connect to `host:port` in blocking mode and apply `config`.
pub fn connect(host: &str, port: u16, config: &SocketConfig) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect((host, port))?;
    configure_stream(&stream, config)?;
    Ok(stream)
}
