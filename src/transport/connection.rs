//! Dialing device sockets.

// ============================================================================
// Imports
// ============================================================================

use std::net::{Ipv6Addr, SocketAddr};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::ChannelConfig;
use crate::error::{Error, Result};

// ============================================================================
// Addressing
// ============================================================================

/// Resolves a device address into a dialable `host:port` target.
///
/// Addresses that already name a port are returned unchanged; bare hosts
/// get `default_port` appended. Bare IPv6 literals are bracketed.
#[must_use]
pub fn socket_target(address: &str, default_port: u16) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address.to_string();
    }

    if address.parse::<Ipv6Addr>().is_ok() {
        return format!("[{address}]:{default_port}");
    }

    if let Some(rest) = address.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((_, port)) if port.parse::<u16>().is_ok() => address.to_string(),
            _ => format!("{address}:{default_port}"),
        };
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            address.to_string()
        }
        _ => format!("{address}:{default_port}"),
    }
}

// ============================================================================
// Dialing
// ============================================================================

/// Opens a TCP connection to `address` under the configured connect deadline.
///
/// # Errors
///
/// - [`Error::Timeout`] if the connect deadline elapses
/// - [`Error::Connection`] if resolution or connect fails
pub async fn dial(address: &str, config: &ChannelConfig) -> Result<TcpStream> {
    let target = socket_target(address, config.device_port);

    debug!(address = %address, target = %target, "Opening telnet connection");

    let stream = timeout(config.connect_timeout, TcpStream::connect(&target))
        .await
        .map_err(|_| {
            Error::timeout(
                format!("connecting to {target}"),
                config.connect_timeout.as_millis() as u64,
            )
        })?
        .map_err(|e| Error::connection(&target, e.to_string()))?;

    stream.set_nodelay(true)?;
    Ok(stream)
}

// ============================================================================
// Tests
// ============================================================================
