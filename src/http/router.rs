//! Request routing.
//!
//! Maps a method and path onto a [`Route`]. Path parameters stay raw
//! strings; validation belongs to the handlers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Route
// ============================================================================

/// A recognized endpoint with its raw path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /health`
    Health,

    /// `PUT /videoswitcher/route/{input}/{output}/{address}/{welcome}`
    SwitchInput {
        input: String,
        output: String,
        address: String,
        welcome: String,
    },

    /// `GET /videoswitcher/input/{address}/{port}/{welcome}`
    InputByPort {
        address: String,
        port: String,
        welcome: String,
    },

    /// `PUT /videoswitcher/frontlock/{address}/{lock}/{welcome}`
    FrontLock {
        address: String,
        lock: String,
        welcome: String,
    },

    /// `GET /videoswitcher/signal/{address}/{port}`
    ActiveSignal { address: String, port: String },

    /// `GET /via/connected/{address}`
    ViaConnected { address: String },

    /// `GET /via/volume/{address}`
    ViaVolume { address: String },

    /// `GET /via/hardware/{address}`
    ViaHardware { address: String },

    /// `GET /via/users/{address}`
    ViaUsers { address: String },
}

/// Why a request matched no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// No route has this path shape.
    NotFound,
    /// The path exists under a different method.
    MethodNotAllowed,
}

impl RouteError {
    /// HTTP status code for this failure.
    #[inline]
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("route not found"),
            Self::MethodNotAllowed => f.write_str("method not allowed"),
        }
    }
}

impl Route {
    /// Resolves `method` and `path` (query string allowed) into a route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when nothing matches.
    pub fn resolve(method: &str, path: &str) -> Result<Self, RouteError> {
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|_| RouteError::NotFound)?;

        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let (route, allowed) = match segments.as_slice() {
            ["health"] => (Self::Health, "GET"),

            ["videoswitcher", "route", input, output, address, welcome] => (
                Self::SwitchInput {
                    input: input.to_string(),
                    output: output.to_string(),
                    address: address.to_string(),
                    welcome: welcome.to_string(),
                },
                "PUT",
            ),

            ["videoswitcher", "input", address, port, welcome] => (
                Self::InputByPort {
                    address: address.to_string(),
                    port: port.to_string(),
                    welcome: welcome.to_string(),
                },
                "GET",
            ),

            ["videoswitcher", "frontlock", address, lock, welcome] => (
                Self::FrontLock {
                    address: address.to_string(),
                    lock: lock.to_string(),
                    welcome: welcome.to_string(),
                },
                "PUT",
            ),

            ["videoswitcher", "signal", address, port] => (
                Self::ActiveSignal {
                    address: address.to_string(),
                    port: port.to_string(),
                },
                "GET",
            ),

            ["via", "connected", address] => (
                Self::ViaConnected {
                    address: address.to_string(),
                },
                "GET",
            ),

            ["via", "volume", address] => (
                Self::ViaVolume {
                    address: address.to_string(),
                },
                "GET",
            ),

            ["via", "hardware", address] => (
                Self::ViaHardware {
                    address: address.to_string(),
                },
                "GET",
            ),

            ["via", "users", address] => (
                Self::ViaUsers {
                    address: address.to_string(),
                },
                "GET",
            ),

            _ => return Err(RouteError::NotFound),
        };

        if !method.eq_ignore_ascii_case(allowed) {
            return Err(RouteError::MethodNotAllowed);
        }

        Ok(route)
    }
}

// ============================================================================
// Tests
// ============================================================================
