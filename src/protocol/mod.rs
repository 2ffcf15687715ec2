//! Line-oriented device protocol.
//!
//! Devices speak ASCII over raw TCP: one command per line, space-separated
//! fields, `\r\n` terminated. Replies are pipe- or colon-delimited tokens
//! terminated by `\n`; an optional welcome banner after connect is
//! terminated by `\r` alone.
//!
//! # Wire Example
//!
//! ```text
//! → Route 3 4\r\n
//! ← Route|3\n
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Immutable command value and its wire rendering |
//! | `codec` | Writing commands and reading delimited frames under deadline |
//! | `reply` | Tokenizing device replies |

// ============================================================================
// Submodules
// ============================================================================

/// Command value and wire rendering.
pub mod command;

/// Frame codec over any async byte stream.
pub mod codec;

/// Reply tokenizer.
pub mod reply;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{CARRIAGE_RETURN, LINE_FEED, read_banner, read_response, read_until, write_command};
pub use command::Command;
pub use reply::Reply;
