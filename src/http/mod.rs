//! HTTP surface.
//!
//! A small HTTP/1.1 front end over the device operations. Every request is
//! answered with a JSON body: the operation result on success, the error
//! message text otherwise.
//!
//! # Routes
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `PUT` | `/videoswitcher/route/{input}/{output}/{address}/{welcome}` | switch input |
//! | `GET` | `/videoswitcher/input/{address}/{port}/{welcome}` | current input |
//! | `PUT` | `/videoswitcher/frontlock/{address}/{lock}/{welcome}` | front-panel lock |
//! | `GET` | `/videoswitcher/signal/{address}/{port}` | active signal |
//! | `GET` | `/via/{connected,volume,hardware,users}/{address}` | collaboration queries |
//! | `GET` | `/health` | liveness |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `router` | Method and path to [`Route`] |
//! | `handlers` | [`AppState`] and error-to-status mapping |
//! | `server` | Accept loop and request framing |

// ============================================================================
// Submodules
// ============================================================================

/// Endpoint handlers.
pub mod handlers;

/// Request routing.
pub mod router;

/// Accept loop.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use handlers::{AppState, HttpResponse};
pub use router::{Route, RouteError};
pub use server::HttpServer;
