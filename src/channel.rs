//! Command channel.
//!
//! Executes exactly one command and reads exactly one response against one
//! address, using either a throwaway connection or the pooled one.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::ChannelConfig;
use crate::error::Result;
use crate::protocol::{Command, read_banner, read_response, write_command};
use crate::transport::{ConnectionPool, dial};

// ============================================================================
// ExecutionMode
// ============================================================================

/// Connection lifecycle for one [`CommandChannel::execute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Dial, optionally read the welcome banner, exchange, close.
    Transient {
        /// Read and discard the banner before writing.
        read_welcome: bool,
    },
    /// Reuse the pooled connection for the address.
    Pooled,
}

impl ExecutionMode {
    /// Maps the HTTP welcome flag onto a lifecycle.
    ///
    /// Devices that greet on connect cannot share a pooled socket, so a
    /// `true` flag selects a transient connection with a banner read.
    #[inline]
    #[must_use]
    pub const fn from_welcome(read_welcome: bool) -> Self {
        if read_welcome {
            Self::Transient { read_welcome: true }
        } else {
            Self::Pooled
        }
    }
}

// ============================================================================
// CommandChannel
// ============================================================================

/// Sends commands to devices and returns their raw responses.
#[derive(Clone)]
pub struct CommandChannel {
    pool: Arc<ConnectionPool>,
}

impl CommandChannel {
    /// Creates a channel backed by `pool`.
    #[inline]
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Returns the pool backing pooled executions.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Returns the channel configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        self.pool.config()
    }

    /// Executes `command` against `address` and returns the response.
    ///
    /// The response has null bytes removed but is otherwise as received,
    /// terminator included.
    ///
    /// # Errors
    ///
    /// Any transport error from dialing, writing, or reading. In pooled
    /// mode the failing connection is invalidated first.
    pub async fn execute(
        &self,
        address: &str,
        command: &Command,
        mode: ExecutionMode,
    ) -> Result<String> {
        debug!(address = %address, command = %command, ?mode, "Sending command");

        let response = match mode {
            ExecutionMode::Transient { read_welcome } => {
                self.execute_transient(address, command, read_welcome).await?
            }
            ExecutionMode::Pooled => self.execute_pooled(address, command).await?,
        };

        debug!(address = %address, response = %response.trim_end(), "Response from device");
        Ok(response)
    }

    async fn execute_transient(
        &self,
        address: &str,
        command: &Command,
        read_welcome: bool,
    ) -> Result<String> {
        let config = self.config();
        let mut stream = dial(address, config).await?;

        if read_welcome {
            let banner = read_banner(&mut stream, config.banner_timeout).await?;
            debug!(address = %address, banner = %banner.trim_end(), "Read welcome message");
        }

        exchange(&mut stream, command, config.response_timeout).await
    }

    async fn execute_pooled(&self, address: &str, command: &Command) -> Result<String> {
        let response_timeout = self.config().response_timeout;
        let (mut conn, _) = self.pool.acquire(address).await?;

        let result = match conn.stream_mut() {
            Ok(stream) => exchange(stream, command, response_timeout).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                conn.touch();
                Ok(response)
            }
            Err(e) => {
                warn!(address = %address, error = %e, "Exchange failed, dropping pooled connection");
                conn.invalidate();
                Err(e)
            }
        }
    }
}

/// Writes one command and reads its response.
async fn exchange(stream: &mut TcpStream, command: &Command, deadline: Duration) -> Result<String> {
    write_command(stream, command).await?;
    read_response(stream, deadline).await
}

// ============================================================================
// Tests
// ============================================================================
