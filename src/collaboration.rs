//! Collaboration endpoint operations.
//!
//! The endpoint shares the line protocol with the switcher but answers with
//! `|`-separated fields, e.g. `Vol|Get|42` or `PList|all|4|anna_1#ben_0`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::{CommandChannel, ExecutionMode};
use crate::error::{Error, Result};
use crate::protocol::{Command, Reply};

// ============================================================================
// Constants
// ============================================================================

/// Collaboration endpoints never greet and are not pooled.
const MODE: ExecutionMode = ExecutionMode::Transient {
    read_welcome: false,
};

/// Marker in the reply to the empty probe command.
const CONNECTED_MARKER: &str = "Successful";

/// Field holding the `#`-separated user list in a `PList` reply.
const USER_LIST_FIELD: usize = 3;

// ============================================================================
// Results
// ============================================================================

/// Network settings reported by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// IPv4 address.
    pub ip_address: String,
    /// MAC address.
    pub mac_address: String,
    /// Default gateway.
    pub gateway: String,
    /// DNS servers.
    pub dns: Vec<String>,
}

/// Identity and network details of an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// Hostname.
    pub hostname: String,
    /// Serial number.
    pub serial_number: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Network settings.
    pub network: NetworkInfo,
}

/// Presence state of one user as encoded in a `PList` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Inactive,
    Active,
    Waiting,
}

impl Presence {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Inactive),
            "1" => Some(Self::Active),
            "2" => Some(Self::Waiting),
            _ => None,
        }
    }
}

/// Users known to the endpoint, grouped by presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Logged in but idle.
    pub inactive_users: Vec<String>,
    /// Currently presenting or sharing.
    pub active_users: Vec<String>,
    /// Waiting for moderator approval.
    pub users_waiting: Vec<String>,
}

// ============================================================================
// CollaborationEndpoint
// ============================================================================

/// Operations on a collaboration endpoint.
#[derive(Clone)]
pub struct CollaborationEndpoint {
    channel: CommandChannel,
}

impl CollaborationEndpoint {
    /// Creates endpoint operations over `channel`.
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

    /// Returns `true` if the endpoint answers the probe successfully.
    ///
    /// Any failure, transport or otherwise, reads as not connected.
    pub async fn is_connected(&self, address: &str) -> bool {
        match self.channel.execute(address, &Command::default(), MODE).await {
            Ok(response) => response.contains(CONNECTED_MARKER),
            Err(e) => {
                debug!(address = %address, error = %e, "Endpoint not reachable");
                false
            }
        }
    }

    /// Returns the current volume level.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the reply holds no level in `0..=255`
    /// - any transport error from the channel
    pub async fn volume(&self, address: &str) -> Result<u8> {
        let command = Command::new("Vol").param1("Get");
        let response = self.channel.execute(address, &command, MODE).await?;
        parse_volume(&Reply::parse(&response))
    }

    /// Collects serial number, firmware, MAC and IP details.
    ///
    /// # Errors
    ///
    /// The first transport error from any of the four queries.
    pub async fn hardware_info(&self, address: &str) -> Result<HardwareInfo> {
        let serial = self.query_value(address, "GetSerialNo").await?;
        let version = self.query_value(address, "GetVersion").await?;
        let mac = self.query_value(address, "GetMacAdd").await?;

        let ip_info = self
            .channel
            .execute(address, &Command::new("IpInfo"), MODE)
            .await?;

        let (hostname, mut network) = parse_ip_info(&Reply::parse(&ip_info));
        network.mac_address = mac;

        Ok(HardwareInfo {
            hostname,
            serial_number: serial,
            firmware_version: version,
            network,
        })
    }

    /// Lists users by presence state.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the reply has no user list field
    /// - any transport error from the channel
    pub async fn users(&self, address: &str) -> Result<UserStatus> {
        let command = Command::new("PList").param1("all").param2(4);
        let response = self.channel.execute(address, &command, MODE).await?;
        parse_users(&Reply::parse(&response))
    }

    async fn query_value(&self, address: &str, verb: &str) -> Result<String> {
        let response = self
            .channel
            .execute(address, &Command::new(verb), MODE)
            .await
            .inspect_err(|e| warn!(address = %address, verb, error = %e, "Query failed"))?;
        Ok(Reply::parse(&response).value().to_string())
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_volume(reply: &Reply) -> Result<u8> {
    let token = reply.index_token()?;
    token
        .parse::<u8>()
        .map_err(|_| Error::protocol(format!("volume {token:?} is out of range")))
}

fn parse_ip_info(reply: &Reply) -> (String, NetworkInfo) {
    let mut hostname = String::new();
    let mut network = NetworkInfo::default();

    for item in reply.fields() {
        let Some((key, value)) = item.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();

        match key.trim() {
            k if k.contains("IP") => network.ip_address = value,
            k if k.contains("GAT") => network.gateway = value,
            k if k.contains("DNS") => network.dns = vec![value],
            k if k.contains("Host") => hostname = value,
            _ => {}
        }
    }

    (hostname, network)
}

fn parse_users(reply: &Reply) -> Result<UserStatus> {
    let fields = reply.fields();
    let list = fields.get(USER_LIST_FIELD).ok_or_else(|| {
        Error::protocol(format!("user list missing from reply {:?}", reply.raw()))
    })?;

    let mut status = UserStatus::default();

    for user in list.split('#').filter(|user| !user.is_empty()) {
        let Some((nickname, code)) = user.split_once('_') else {
            continue;
        };

        match Presence::from_code(code) {
            Some(Presence::Inactive) => status.inactive_users.push(nickname.to_string()),
            Some(Presence::Active) => status.active_users.push(nickname.to_string()),
            Some(Presence::Waiting) => status.users_waiting.push(nickname.to_string()),
            None => {}
        }
    }

    Ok(status)
}

// ============================================================================
// Tests
// ============================================================================
