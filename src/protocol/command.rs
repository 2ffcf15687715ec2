//! Device command value.
//!
//! A [`Command`] is a verb plus up to three parameters. It renders as the
//! space-joined fields followed by `\r\n`. Spaces inside a parameter are
//! indistinguishable from field separators on the wire.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::codec::{CARRIAGE_RETURN, LINE_FEED};

// ============================================================================
// Command
// ============================================================================

/// One request to a device.
///
/// # Example
///
/// ```
/// use avswitch_control::protocol::Command;
///
/// let command = Command::new("Route").param1("3").param2("4");
/// assert_eq!(command.to_line(), "Route 3 4");
/// assert_eq!(command.to_wire(), b"Route 3 4\r\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    verb: String,
    param1: Option<String>,
    param2: Option<String>,
    param3: Option<String>,
}

impl Command {
    /// Creates a command with no parameters.
    #[inline]
    #[must_use]
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            ..Self::default()
        }
    }

    /// Sets the first parameter.
    #[inline]
    #[must_use]
    pub fn param1(mut self, value: impl ToString) -> Self {
        self.param1 = Some(value.to_string());
        self
    }

    /// Sets the second parameter.
    #[inline]
    #[must_use]
    pub fn param2(mut self, value: impl ToString) -> Self {
        self.param2 = Some(value.to_string());
        self
    }

    /// Sets the third parameter.
    #[inline]
    #[must_use]
    pub fn param3(mut self, value: impl ToString) -> Self {
        self.param3 = Some(value.to_string());
        self
    }

    /// Returns the verb.
    #[inline]
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the fields in wire order, skipping empty ones.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.verb.as_str())
            .chain(self.param1.as_deref())
            .chain(self.param2.as_deref())
            .chain(self.param3.as_deref())
            .filter(|field| !field.is_empty())
    }

    /// Renders the command line without its terminator.
    #[must_use]
    pub fn to_line(&self) -> String {
        self.fields().collect::<Vec<_>>().join(" ")
    }

    /// Renders the full wire frame, terminator included.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = self.to_line().into_bytes();
        bytes.push(CARRIAGE_RETURN);
        bytes.push(LINE_FEED);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

// ============================================================================
// Tests
// ============================================================================
