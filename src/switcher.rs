//! Matrix video switcher operations.
//!
//! Each operation validates its external (0-based) indices before any I/O,
//! translates them once into device (1-based) indices, runs one command
//! through the [`CommandChannel`], and translates any index in the reply
//! back.
//!
//! # Wire Vocabulary
//!
//! | Operation | Command | Reply |
//! |-----------|---------|-------|
//! | Route | `Route <in> <out>` | `Route\|<in>` |
//! | Query input | `Route Get <out>` | `Route\|<in>` |
//! | Front lock | `Lock On` / `Lock Off` | `Lock\|...` |
//! | Signal | `Signal <in>` | raw status, e.g. `Signal\|<in>\|1` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{CommandChannel, ExecutionMode};
use crate::error::{Error, Result};
use crate::index::{ExternalPort, parse_external, to_external_index};
use crate::protocol::{Command, Reply};

// ============================================================================
// Constants
// ============================================================================

const ROUTE_VERB: &str = "Route";
const QUERY_PARAM: &str = "Get";
const LOCK_VERB: &str = "Lock";
const SIGNAL_VERB: &str = "Signal";

// ============================================================================
// Results
// ============================================================================

/// Input routed to an output, annotated as `"<input>:<output>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedInput {
    /// `"<externalInput>:<externalOutput>"`.
    pub input: String,
    /// External output index, present for routing results.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<String>,
}

/// Raw signal-detect reply for one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalStatus(String);

impl SignalStatus {
    /// Returns the reply text as received, terminator removed.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.0
    }

    /// Interprets a trailing `1`/`0` token, if there is one.
    #[must_use]
    pub fn is_active(&self) -> Option<bool> {
        match Reply::parse(&self.0).tokens().last().copied() {
            Some("1") => Some(true),
            Some("0") => Some(false),
            _ => None,
        }
    }
}

// ============================================================================
// VideoSwitcher
// ============================================================================

/// Operations on a telnet-controlled matrix switcher.
#[derive(Clone)]
pub struct VideoSwitcher {
    channel: CommandChannel,
}

impl VideoSwitcher {
    /// Creates switcher operations over `channel`.
    #[inline]
    #[must_use]
    pub fn new(channel: CommandChannel) -> Self {
        Self { channel }
    }

    /// Returns the underlying channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Routes `input` to `output`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if either index is not a non-negative integer
    /// - [`Error::Protocol`] if the acknowledgement carries no valid input index
    /// - any transport error from the channel
    pub async fn switch_input(
        &self,
        address: &str,
        input: &str,
        output: &str,
        mode: ExecutionMode,
    ) -> Result<RoutedInput> {
        let input = parse_external(input)?;
        let output = parse_external(output)?;

        debug!(address = %address, %input, %output, "Routing input to output");

        let command = Command::new(ROUTE_VERB)
            .param1(input.to_device()?)
            .param2(output.to_device()?);

        let response = self.channel.execute(address, &command, mode).await?;
        let routed = reported_input(&Reply::parse(&response))?;

        info!(address = %address, input = %routed, %output, "Input routed");

        Ok(RoutedInput {
            input: format!("{routed}:{output}"),
            output: Some(output.to_string()),
        })
    }

    /// Returns the input currently routed to output `port`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `port` is not a non-negative integer
    /// - [`Error::Protocol`] if the reply carries no valid input index
    /// - any transport error from the channel
    pub async fn get_current_input_by_output_port(
        &self,
        address: &str,
        port: &str,
        mode: ExecutionMode,
    ) -> Result<RoutedInput> {
        let port = parse_external(port)?;

        debug!(address = %address, %port, "Getting input for output port");

        let command = Command::new(ROUTE_VERB)
            .param1(QUERY_PARAM)
            .param2(port.to_device()?);

        let response = self.channel.execute(address, &command, mode).await?;
        let input = reported_input(&Reply::parse(&response))?;

        Ok(RoutedInput {
            input: format!("{input}:{port}"),
            output: None,
        })
    }

    /// Locks or unlocks the front panel buttons.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the device does not acknowledge the lock command
    /// - any transport error from the channel
    pub async fn set_front_lock(&self, address: &str, locked: bool, mode: ExecutionMode) -> Result<()> {
        let state = if locked { "On" } else { "Off" };

        debug!(address = %address, locked, "Setting front button lock");

        let command = Command::new(LOCK_VERB).param1(state);
        let response = self.channel.execute(address, &command, mode).await?;
        Reply::parse(&response).expect_verb(LOCK_VERB)?;

        Ok(())
    }

    /// Returns the signal-detect status of input `port`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `port` is not a non-negative integer
    /// - [`Error::Protocol`] if the reply is empty or an error
    /// - any transport error from the channel
    pub async fn get_active_signal_by_port(
        &self,
        address: &str,
        port: &str,
        mode: ExecutionMode,
    ) -> Result<SignalStatus> {
        let port = parse_external(port)?;

        debug!(address = %address, %port, "Checking active signal");

        let command = Command::new(SIGNAL_VERB).param1(port.to_device()?);
        let response = self.channel.execute(address, &command, mode).await?;
        let reply = Reply::parse(&response);

        if reply.raw().is_empty() {
            return Err(Error::protocol("empty signal status reply"));
        }
        if reply.is_error() {
            return Err(Error::protocol(format!(
                "device rejected signal query: {}",
                reply.raw()
            )));
        }

        Ok(SignalStatus(reply.raw().to_string()))
    }
}

/// Extracts the device input index from a routing reply and translates it.
fn reported_input(reply: &Reply) -> Result<ExternalPort> {
    if reply.is_error() {
        return Err(Error::protocol(format!(
            "device rejected route: {}",
            reply.raw()
        )));
    }

    let token = reply.index_token()?;
    to_external_index(token)
        .map_err(|_| Error::protocol(format!("device reported invalid input index {token:?}")))
}

// ============================================================================
// Tests
// ============================================================================
