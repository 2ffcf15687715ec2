//! Endpoint handlers and error-to-status mapping.
//!
//! Handlers parse flags before touching the network, call into the device
//! operations, and render either the result or the error text as JSON.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::{CommandChannel, ExecutionMode};
use crate::collaboration::CollaborationEndpoint;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::index::parse_flag;
use crate::switcher::VideoSwitcher;
use crate::transport::ConnectionPool;

use super::router::{Route, RouteError};

// ============================================================================
// Constants
// ============================================================================

const SUCCESS_BODY: &str = "Success";

/// Signal checks always greet-and-close.
const SIGNAL_MODE: ExecutionMode = ExecutionMode::Transient { read_welcome: true };

// ============================================================================
// HttpResponse
// ============================================================================

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl HttpResponse {
    /// 200 with `body` serialized to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` cannot be serialized.
    pub fn ok<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self {
            status: 200,
            body: serde_json::to_value(body)?,
        })
    }

    /// Error response carrying the error's message.
    ///
    /// Invalid arguments are client errors; everything else is a server
    /// error.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let status = if error.is_invalid_argument() { 400 } else { 500 };
        Self {
            status,
            body: Value::String(error.to_string()),
        }
    }

    /// 404/405 for an unmatched request.
    #[must_use]
    pub fn from_route_error(error: RouteError) -> Self {
        Self {
            status: error.status(),
            body: Value::String(error.to_string()),
        }
    }

    /// Reason phrase for the status line.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            _ => "Internal Server Error",
        }
    }
}

// ============================================================================
// AppState
// ============================================================================

/// Device operations shared by every request task.
pub struct AppState {
    switcher: VideoSwitcher,
    collaboration: CollaborationEndpoint,
}

impl AppState {
    /// Wires prebuilt operations together.
    #[inline]
    #[must_use]
    pub fn new(switcher: VideoSwitcher, collaboration: CollaborationEndpoint) -> Self {
        Self {
            switcher,
            collaboration,
        }
    }

    /// Starts one pool per device family and builds the operations on them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either channel configuration is invalid.
    pub fn start(config: &ServiceConfig) -> Result<Self> {
        let switcher_pool = ConnectionPool::start(config.switcher.clone())?;
        let collaboration_pool = ConnectionPool::start(config.collaboration.clone())?;

        Ok(Self::new(
            VideoSwitcher::new(CommandChannel::new(switcher_pool)),
            CollaborationEndpoint::new(CommandChannel::new(collaboration_pool)),
        ))
    }

    /// Returns the switcher operations.
    #[inline]
    #[must_use]
    pub fn switcher(&self) -> &VideoSwitcher {
        &self.switcher
    }

    /// Closes every pooled connection.
    pub async fn shutdown(&self) {
        self.switcher.channel().pool().shutdown().await;
        self.collaboration.channel().pool().shutdown().await;
    }

    /// Runs the handler for `route`.
    pub async fn handle(&self, route: Route) -> HttpResponse {
        debug!(?route, "Handling request");

        let result = match route {
            Route::Health => HttpResponse::ok(&"ok"),

            Route::SwitchInput {
                input,
                output,
                address,
                welcome,
            } => self.switch_input(&input, &output, &address, &welcome).await,

            Route::InputByPort {
                address,
                port,
                welcome,
            } => self.input_by_port(&address, &port, &welcome).await,

            Route::FrontLock {
                address,
                lock,
                welcome,
            } => self.front_lock(&address, &lock, &welcome).await,

            Route::ActiveSignal { address, port } => self.active_signal(&address, &port).await,

            Route::ViaConnected { address } => {
                HttpResponse::ok(&self.collaboration.is_connected(&address).await)
            }

            Route::ViaVolume { address } => self
                .collaboration
                .volume(&address)
                .await
                .and_then(|volume| HttpResponse::ok(&volume)),

            Route::ViaHardware { address } => self
                .collaboration
                .hardware_info(&address)
                .await
                .and_then(|info| HttpResponse::ok(&info)),

            Route::ViaUsers { address } => self
                .collaboration
                .users(&address)
                .await
                .and_then(|users| HttpResponse::ok(&users)),
        };

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Request failed");
            HttpResponse::from_error(&e)
        })
    }
}

// ============================================================================
// AppState - Switcher Handlers
// ============================================================================

impl AppState {
    async fn switch_input(
        &self,
        input: &str,
        output: &str,
        address: &str,
        welcome: &str,
    ) -> Result<HttpResponse> {
        let mode = ExecutionMode::from_welcome(parse_flag("welcome", welcome)?);
        let routed = self
            .switcher
            .switch_input(address, input, output, mode)
            .await?;
        HttpResponse::ok(&routed)
    }

    async fn input_by_port(&self, address: &str, port: &str, welcome: &str) -> Result<HttpResponse> {
        let mode = ExecutionMode::from_welcome(parse_flag("welcome", welcome)?);
        let input = self
            .switcher
            .get_current_input_by_output_port(address, port, mode)
            .await?;
        HttpResponse::ok(&input)
    }

    async fn front_lock(&self, address: &str, lock: &str, welcome: &str) -> Result<HttpResponse> {
        let locked = parse_flag("front-button-lock", lock)?;
        let mode = ExecutionMode::from_welcome(parse_flag("welcome", welcome)?);
        self.switcher.set_front_lock(address, locked, mode).await?;
        HttpResponse::ok(&SUCCESS_BODY)
    }

    async fn active_signal(&self, address: &str, port: &str) -> Result<HttpResponse> {
        let signal = self
            .switcher
            .get_active_signal_by_port(address, port, SIGNAL_MODE)
            .await?;
        HttpResponse::ok(&signal)
    }
}

// ============================================================================
// Tests
// ============================================================================
