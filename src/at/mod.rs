//! AT Command Channel
//!
//! This module defines the contract between the HFP layers and the AT command
//! transport running over the RFCOMM link. The transport itself (line framing,
//! timeouts, final result code detection) lives outside this crate; the HFP
//! code only needs to send a command, collect the intermediate lines that
//! carry one of the expected prefixes, and receive unsolicited result codes
//! for the prefixes it registered.
//!
//! ## Reply Parsing
//!
//! Replies are parsed with [`AtResultIter`], a cursor over the collected lines
//! that reads numbers, quoted and unquoted strings, ranges and parenthesised
//! lists the way AT responses are laid out:
//!
//! ```rust
//! use callbird::at::{AtResponse, AtResultIter};
//!
//! let response = AtResponse::from_lines(&["+BRSF: 871"]).unwrap();
//! let mut iter = AtResultIter::new(&response);
//! assert!(iter.next("+BRSF:"));
//! assert_eq!(iter.next_number(), Some(871));
//! ```

pub mod result;

pub use result::AtResultIter;

use crate::constants::{MAX_AT_LINE_LENGTH, MAX_AT_RESPONSE_LINES};
use heapless::{String, Vec};

/// A single response or unsolicited line, without line terminators
pub type AtLine = String<MAX_AT_LINE_LENGTH>;

/// Errors reported by the AT command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// The channel refused to queue the command
    NotQueued,
    /// The command completed with a plain `ERROR` final result
    Error,
    /// The command completed with `+CME ERROR: <code>`
    CmeError(u16),
    /// No final result arrived in time
    Timeout,
    /// The underlying link went away
    Disconnected,
    /// A line did not fit the response buffers
    Overflow,
}

impl core::fmt::Display for AtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotQueued => write!(f, "AT command could not be queued"),
            Self::Error => write!(f, "AT command failed"),
            Self::CmeError(code) => write!(f, "AT command failed with CME error {code}"),
            Self::Timeout => write!(f, "AT command timed out"),
            Self::Disconnected => write!(f, "AT channel disconnected"),
            Self::Overflow => write!(f, "AT response exceeds buffer capacity"),
        }
    }
}

/// Intermediate lines collected for one successfully completed command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtResponse {
    lines: Vec<AtLine, MAX_AT_RESPONSE_LINES>,
}

impl AtResponse {
    /// Create an empty response (a bare `OK`)
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a response from string slices
    ///
    /// # Errors
    /// Returns [`AtError::Overflow`] if a line or the line count exceeds capacity
    pub fn from_lines(lines: &[&str]) -> Result<Self, AtError> {
        let mut response = Self::new();
        for line in lines {
            response.push_line(line)?;
        }
        Ok(response)
    }

    /// Append one line
    ///
    /// # Errors
    /// Returns [`AtError::Overflow`] if the line or the line count exceeds capacity
    pub fn push_line(&mut self, line: &str) -> Result<(), AtError> {
        let line = AtLine::try_from(line).map_err(|()| AtError::Overflow)?;
        self.lines.push(line).map_err(|_| AtError::Overflow)
    }

    /// Collected lines in arrival order
    #[must_use]
    pub fn lines(&self) -> &[AtLine] {
        &self.lines
    }

    /// Whether no intermediate lines were collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// AT command transport consumed by the HFP layers
///
/// Implementations serialize commands on the wire; several users may share
/// one channel and their commands simply interleave.
#[allow(async_fn_in_trait)]
pub trait AtChannel {
    /// Send `command` and wait for its final result.
    ///
    /// Intermediate lines starting with any of `prefixes` are collected into
    /// the returned [`AtResponse`]; an empty slice collects nothing.
    ///
    /// # Errors
    /// Returns [`AtError::NotQueued`] if the command cannot be queued, or the
    /// failure the command completed with.
    async fn send(&self, command: &str, prefixes: &[&str]) -> Result<AtResponse, AtError>;

    /// Queue `command` without waiting for or inspecting its result.
    ///
    /// # Errors
    /// Returns [`AtError::NotQueued`] if the command cannot be queued.
    fn post(&self, command: &str) -> Result<(), AtError>;

    /// Start delivering unsolicited lines starting with `prefix`.
    ///
    /// # Errors
    /// Returns [`AtError::Overflow`] if no more registrations fit.
    fn register(&self, prefix: &'static str) -> Result<(), AtError>;

    /// Wait for the next unsolicited line matching a registered prefix.
    async fn unsolicited(&self) -> AtLine;
}
