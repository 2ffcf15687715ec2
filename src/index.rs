//! Port index translation between the service and the device.
//!
//! The HTTP surface numbers ports from 0; the switcher numbers them from 1.
//! [`ExternalPort`] and [`DevicePort`] keep the two namespaces apart so a
//! value is translated exactly once at each boundary crossing.
//!
//! Parsing fails closed: anything that is not a non-negative integer is an
//! [`Error::InvalidArgument`], whichever helper sees it first.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ExternalPort
// ============================================================================

/// A 0-based port index as seen by HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalPort(u32);

impl ExternalPort {
    /// Wraps a raw 0-based index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw 0-based index.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Translates into the device namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the index is `u32::MAX`.
    pub fn to_device(self) -> Result<DevicePort> {
        self.0
            .checked_add(1)
            .map(DevicePort)
            .ok_or_else(|| Error::invalid_argument(format!("port index {} is out of range", self.0)))
    }
}

impl fmt::Display for ExternalPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// DevicePort
// ============================================================================

/// A 1-based port index as the switcher expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePort(u32);

impl DevicePort {
    /// Wraps a raw 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for 0, which no device port uses.
    pub fn new(index: u32) -> Result<Self> {
        if index == 0 {
            return Err(Error::invalid_argument("device port indices start at 1"));
        }
        Ok(Self(index))
    }

    /// Returns the raw 1-based index.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Translates into the external namespace.
    #[inline]
    #[must_use]
    pub const fn to_external(self) -> ExternalPort {
        ExternalPort(self.0 - 1)
    }
}

impl fmt::Display for DevicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Translation
// ============================================================================

/// Parses an external index and converts it to the device namespace (`n + 1`).
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `s` is not an integer or is negative.
pub fn to_device_index(s: &str) -> Result<DevicePort> {
    parse_external(s)?.to_device()
}

/// Parses a device index and converts it to the external namespace (`n - 1`).
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `s` is not an integer or is below 1.
pub fn to_external_index(s: &str) -> Result<ExternalPort> {
    let n = parse_integer(s)?;
    let index = u32::try_from(n)
        .map_err(|_| Error::invalid_argument(format!("device port index {s} is out of range")))?;
    Ok(DevicePort::new(index)?.to_external())
}

/// Returns whether `s` is a negative integer.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `s` is not an integer at all.
pub fn is_negative(s: &str) -> Result<bool> {
    Ok(parse_integer(s)? < 0)
}

/// Parses an external index, rejecting negatives.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `s` is not a non-negative integer.
pub fn parse_external(s: &str) -> Result<ExternalPort> {
    let n = parse_integer(s)?;
    if n < 0 {
        return Err(Error::invalid_argument(format!(
            "port index {s} must be zero or greater"
        )));
    }
    u32::try_from(n)
        .map(ExternalPort)
        .map_err(|_| Error::invalid_argument(format!("port index {s} is out of range")))
}

/// Parses a boolean path flag named `name`.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the flag for any other value.
pub fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(Error::invalid_argument(format!(
            "{name} must be a true/false value, got {value:?}"
        ))),
    }
}

fn parse_integer(s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| Error::invalid_argument(format!("{s:?} is not a valid port index")))
}

// ============================================================================
// Tests
// ============================================================================
