//! AV switch control - HTTP control service for telnet-style AV devices.
//!
//! Matrix switchers and collaboration endpoints are driven over a plain
//! ASCII line protocol on raw TCP. This crate exposes a handful of device
//! operations over HTTP and keeps at most one live socket per device
//! address, reusing it while it stays busy and closing it once idle.
//!
//! # Architecture
//!
//! ```text
//! HTTP request
//!      │
//!      ▼
//! http::Route ──► VideoSwitcher / CollaborationEndpoint
//!                          │
//!                          ▼
//!                   CommandChannel ──transient──► dial, exchange, close
//!                          │
//!                        pooled
//!                          ▼
//!                   ConnectionPool ──► one socket per address
//! ```
//!
//! Key design principles:
//!
//! - One command, one response per exchange, serialized per address
//! - Concurrent first requests to an address share a single dial
//! - Any failed pooled exchange discards the connection
//! - Path parameters are validated before any network I/O
//!
//! # Quick Start
//!
//! ```no_run
//! use avswitch_control::{
//!     ChannelConfig, CommandChannel, ConnectionPool, ExecutionMode, Result, VideoSwitcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = ConnectionPool::start(ChannelConfig::default())?;
//!     let switcher = VideoSwitcher::new(CommandChannel::new(pool.clone()));
//!
//!     // Route external input 2 to external output 3
//!     let routed = switcher
//!         .switch_input("10.5.34.12", "2", "3", ExecutionMode::Pooled)
//!         .await?;
//!     println!("Routed {}", routed.input);
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | One-command exchanges, transient or pooled |
//! | [`collaboration`] | Collaboration endpoint queries |
//! | [`config`] | Timing, ports and service configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | HTTP routes, handlers and server |
//! | [`index`] | External/device port numbering |
//! | [`protocol`] | Line protocol commands, framing and replies |
//! | [`switcher`] | Matrix switcher operations |
//! | [`transport`] | Dialing and the connection pool |

// ============================================================================
// Modules
// ============================================================================

/// Command channel.
///
/// [`CommandChannel::execute`] writes one command and reads one response,
/// on a throwaway socket or the pooled one per [`ExecutionMode`].
pub mod channel;

/// Collaboration endpoint operations.
pub mod collaboration;

/// Configuration.
///
/// [`ChannelConfig`] holds per-device-family timing; [`ServiceConfig`]
/// adds the listen address and loads from the environment.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// HTTP surface.
pub mod http;

/// Port index translation.
///
/// Clients count ports from 0; devices count from 1.
pub mod index;

/// Device line protocol.
///
/// Internal module defining commands, frame codec and reply parsing.
pub mod protocol;

/// Matrix switcher operations.
pub mod switcher;

/// TCP transport.
///
/// Internal module handling dialing and the keyed connection pool.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{CommandChannel, ExecutionMode};

// Device operations
pub use collaboration::{CollaborationEndpoint, HardwareInfo, NetworkInfo, UserStatus};
pub use switcher::{RoutedInput, SignalStatus, VideoSwitcher};

// Configuration
pub use config::{ChannelConfig, ServiceConfig};

// Error types
pub use error::{Error, Result};

// Index types
pub use index::{DevicePort, ExternalPort};

// Protocol types
pub use protocol::{Command, Reply};

// Transport types
pub use transport::ConnectionPool;
