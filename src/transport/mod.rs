//! TCP transport to devices.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ConnectionPool              │
//! │  ┌────────────────────────────────────┐  │
//! │  │ "10.5.34.12" → Mutex<EntryState>   │  │
//! │  │ "10.5.34.13" → Mutex<EntryState>   │  │
//! │  └────────────────────────────────────┘  │
//! │  sweep task ── evicts idle entries       │
//! └──────────────────────────────────────────┘
//!                    │ dial
//!                    ▼
//!          device:5000 (raw TCP)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Address resolution and dialing under deadline |
//! | `pool` | Keyed connection registry and idle evictor |

// ============================================================================
// Submodules
// ============================================================================

/// Address resolution and dialing.
pub mod connection;

/// Keyed connection pool.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{dial, socket_target};
pub use pool::{CloseReason, ConnectionPool, PooledConnection};
