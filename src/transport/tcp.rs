//! TCP connection helper.
//!
//! Parses server addresses and opens the `TcpStream` a session runs over.
//! The stream stays owned by the caller.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{Error, Result};

/// Port servers listen on by default.
pub const DEFAULT_PORT: u16 = 8896;

/// Address used when none is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8896";

/// Configuration for a TCP connection to an HWIO server.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Server address: `host`, `host:port`, `[ipv6]` or `[ipv6]:port`.
    pub address: String,
    /// Limit on connection setup, if any.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm. Small request frames go out immediately.
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_ADDRESS)
    }
}

impl TcpConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: None,
            nodelay: true,
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets `TCP_NODELAY`.
    #[must_use]
    pub const fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

/// Splits an address into host and port.
///
/// Accepts `host`, `host:port`, `[ipv6]`, `[ipv6]:port` and bare IPv6
/// literals. A missing port becomes [`DEFAULT_PORT`].
pub fn parse_address(address: &str) -> Result<(String, u16)> {
    let invalid = |reason: &str| Error::invalid_argument(format!("{reason}: {address:?}"));
    let parse_port = |s: &str| s.parse::<u16>().map_err(|_| invalid("bad port"));

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
        let port = match tail {
            "" => DEFAULT_PORT,
            _ => parse_port(tail.strip_prefix(':').ok_or_else(|| invalid("bad port"))?)?,
        };
        return Ok((host.to_string(), port));
    }

    match address.matches(':').count() {
        0 => non_empty(address, DEFAULT_PORT, invalid),
        1 => {
            let (host, tail) = address.split_once(':').unwrap_or((address, ""));
            non_empty(host, parse_port(tail)?, invalid)
        }
        // Bare IPv6 literal without a port.
        _ => Ok((address.to_string(), DEFAULT_PORT)),
    }
}

fn non_empty(host: &str, port: u16, invalid: impl Fn(&str) -> Error) -> Result<(String, u16)> {
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok((host.to_string(), port))
}

/// Opens a TCP connection to the configured server.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` for a malformed address and
/// `Error::Transport` if resolution or connection fails or times out.
pub async fn connect(config: &TcpConfig) -> Result<TcpStream> {
    let (host, port) = parse_address(&config.address)?;
    tracing::info!("connecting to hwio server {host}:{port}");

    let connecting = TcpStream::connect((host.as_str(), port));
    let stream = match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {} timed out", config.address),
            )
        })??,
        None => connecting.await?,
    };

    if let Err(e) = stream.set_nodelay(config.nodelay) {
        tracing::warn!("failed to set TCP_NODELAY: {}", e);
    }

    tracing::info!("connected to hwio server");
    Ok(stream)
}
