//! AV switch control service.
//!
//! Reads configuration from the environment, serves HTTP until Ctrl+C,
//! then closes every pooled device connection.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AVSWITCH_LISTEN_ADDR` | `0.0.0.0:8014` |
//! | `AVSWITCH_DEVICE_PORT` | `5000` |
//! | `AVSWITCH_VIA_PORT` | `9982` |
//! | `AVSWITCH_IDLE_TIMEOUT_SECS` | `10` |
//! | `RUST_LOG` | `avswitch_control=info` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use avswitch_control::Result;
use avswitch_control::config::ServiceConfig;
use avswitch_control::http::{AppState, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_FILTER: &str = "avswitch_control=info";

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn wait_for_exit() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = ServiceConfig::from_env()?;
    info!(
        listen = %config.listen_addr,
        switcher_port = config.switcher.device_port,
        collaboration_port = config.collaboration.device_port,
        "Starting avswitch-control"
    );

    let state = Arc::new(AppState::start(&config)?);
    let server = HttpServer::bind(config.listen_addr).await?;

    server.serve(Arc::clone(&state), wait_for_exit()).await?;

    state.shutdown().await;
    info!("Stopped");
    Ok(())
}
