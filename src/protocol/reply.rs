//! Device reply tokenizer.
//!
//! Replies look like `Route|3`, `Vol|Get|42` or `IP:10.0.0.9|GAT:10.0.0.1`.
//! [`Reply::fields`] splits on `|` only; [`Reply::tokens`] splits on both
//! `|` and `:`.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

const FIELD_SEPARATOR: char = '|';
const KEY_SEPARATOR: char = ':';

/// First token of a reply the device uses to reject a command.
const ERROR_VERB: &str = "Error";

// ============================================================================
// Reply
// ============================================================================

/// A device reply with its line terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    raw: String,
}

impl Reply {
    /// Wraps a raw response, trimming surrounding `\r`/`\n`.
    #[must_use]
    pub fn parse(response: &str) -> Self {
        Self {
            raw: response.trim_matches(['\r', '\n']).to_string(),
        }
    }

    /// Returns the reply text without its terminator.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the `|`-separated fields, trimmed.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.raw.split(FIELD_SEPARATOR).map(str::trim).collect()
    }

    /// Returns the `|`/`:`-separated tokens, trimmed, empties dropped.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.raw
            .split([FIELD_SEPARATOR, KEY_SEPARATOR])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Returns the field after the first `|`, or the whole reply when
    /// there is none.
    #[must_use]
    pub fn value(&self) -> &str {
        let mut fields = self.raw.split(FIELD_SEPARATOR);
        let first = fields.next().unwrap_or_default();
        fields.next().unwrap_or(first).trim()
    }

    /// Returns the leading token, typically the echoed verb.
    #[must_use]
    pub fn verb(&self) -> Option<&str> {
        self.tokens().first().copied()
    }

    /// Returns `true` if the device rejected the command.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.verb()
            .is_some_and(|verb| verb.eq_ignore_ascii_case(ERROR_VERB))
    }

    /// Fails unless the reply echoes `verb`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reply is an error or echoes a
    /// different verb.
    pub fn expect_verb(&self, verb: &str) -> Result<&Self> {
        if self.is_error() {
            return Err(Error::protocol(format!(
                "device rejected {verb}: {}",
                self.raw
            )));
        }

        match self.verb() {
            Some(echoed) if echoed.eq_ignore_ascii_case(verb) => Ok(self),
            _ => Err(Error::protocol(format!(
                "expected {verb} acknowledgement, got {:?}",
                self.raw
            ))),
        }
    }

    /// Returns the last token that parses as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if no such token exists.
    pub fn index_token(&self) -> Result<&str> {
        self.tokens()
            .into_iter()
            .rev()
            .find(|token| token.parse::<i64>().is_ok())
            .ok_or_else(|| Error::protocol(format!("no index in reply {:?}", self.raw)))
    }
}

// ============================================================================
// Tests
// ============================================================================
