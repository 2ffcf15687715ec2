//! Service and channel configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use avswitch_control::ChannelConfig;
//!
//! let config = ChannelConfig::default()
//!     .with_device_port(5000)
//!     .with_idle_timeout(Duration::from_secs(10));
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Telnet control port of the matrix switcher.
pub const DEFAULT_SWITCHER_PORT: u16 = 5000;

/// Control port of the collaboration endpoint.
pub const DEFAULT_COLLABORATION_PORT: u16 = 9982;

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8014";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable names.
const ENV_LISTEN_ADDR: &str = "AVSWITCH_LISTEN_ADDR";
const ENV_DEVICE_PORT: &str = "AVSWITCH_DEVICE_PORT";
const ENV_IDLE_TIMEOUT_SECS: &str = "AVSWITCH_IDLE_TIMEOUT_SECS";
const ENV_VIA_PORT: &str = "AVSWITCH_VIA_PORT";

// ============================================================================
// ChannelConfig
// ============================================================================

/// Timing and addressing for one command channel and its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Port dialed when an address carries none.
    pub device_port: u16,
    /// Deadline for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for the welcome banner on transient connections.
    pub banner_timeout: Duration,
    /// Deadline for a command response.
    pub response_timeout: Duration,
    /// How long a pooled connection may sit unused before eviction.
    pub idle_timeout: Duration,
    /// How often the evictor scans the pool.
    pub sweep_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            device_port: DEFAULT_SWITCHER_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ChannelConfig {
    /// Sets the default device port.
    #[inline]
    #[must_use]
    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }

    /// Sets the connect deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the banner read deadline.
    #[inline]
    #[must_use]
    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    /// Sets the response read deadline.
    #[inline]
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the idle eviction window.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the evictor scan interval.
    #[inline]
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero port or any zero duration.
    pub fn validate(&self) -> Result<()> {
        if self.device_port == 0 {
            return Err(Error::config("device port must be non-zero"));
        }

        let durations = [
            ("connect timeout", self.connect_timeout),
            ("banner timeout", self.banner_timeout),
            ("response timeout", self.response_timeout),
            ("idle timeout", self.idle_timeout),
            ("sweep interval", self.sweep_interval),
        ];

        for (name, value) in durations {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }
}

// ============================================================================
// ServiceConfig
// ============================================================================

/// Top-level configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Channel settings for matrix switchers.
    pub switcher: ChannelConfig,
    /// Channel settings for collaboration endpoints.
    pub collaboration: ChannelConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8014)),
            switcher: ChannelConfig::default(),
            collaboration: ChannelConfig::default().with_device_port(DEFAULT_COLLABORATION_PORT),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<SocketAddr, _>(&lookup, ENV_LISTEN_ADDR)? {
            config.listen_addr = addr;
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, ENV_DEVICE_PORT)? {
            config.switcher.device_port = port;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_IDLE_TIMEOUT_SECS)? {
            config.switcher.idle_timeout = Duration::from_secs(secs);
            config.collaboration.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, ENV_VIA_PORT)? {
            config.collaboration.device_port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates both channel configurations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.switcher.validate()?;
        self.collaboration.validate()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::config(format!("{key} has invalid value {raw:?}")))
}

// ============================================================================
// Tests
// ============================================================================
