#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::too_many_lines)]

mod fmt;

mod address;
pub mod api;
pub mod at;
pub mod constants;
pub mod hfp;
pub mod phonebook;
pub mod processor;
pub mod sim;

#[cfg(test)]
mod mock;

use heapless::Vec;

pub use address::BluetoothAddress;
pub use api::HandsfreeControl;
pub use hfp::{HfpError, HfpVersion};
pub use phonebook::{ExportSummary, PhonebookAssembler, PhonebookEntry, PhonebookError};

use crate::constants::MAX_SUBSCRIBER_NUMBERS;
use crate::hfp::SubscriberNumber;

/// Options for configuring the Hands-Free side of a link
///
/// # Examples
///
/// ```rust
/// use callbird::{HfpOptions, HfpVersion};
///
/// // HFP 1.7, narrowband only
/// let default_options = HfpOptions::default();
///
/// // Older profile version with mSBC available
/// let options = HfpOptions {
///     version: HfpVersion::V1_6,
///     wideband_speech: true,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HfpOptions {
    /// Profile version; decides which HF features are advertised
    pub version: HfpVersion,
    /// Offer mSBC next to CVSD during codec negotiation
    pub wideband_speech: bool,
}

impl Default for HfpOptions {
    fn default() -> Self {
        Self {
            version: HfpVersion::V1_7,
            wideband_speech: false,
        }
    }
}

/// API requests sent to the handsfree processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Request {
    /// Query subscriber numbers
    SubscriberNumbers,
    /// Request a number for a voice tag
    PhoneNumber,
    /// Start or stop voice recognition
    VoiceRecognition(bool),
    /// Disable echo cancelling and noise reduction
    DisableNrec,
    /// Report an HF indicator value
    HfIndicator {
        /// Indicator identifier
        id: u16,
        /// Reported value
        value: u32,
    },
}

/// API responses sent from the handsfree processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Response {
    /// Subscriber numbers
    SubscriberNumbers(Vec<SubscriberNumber, MAX_SUBSCRIBER_NUMBERS>),
    /// Voice tag number
    PhoneNumber(SubscriberNumber),
    /// Request completed
    Done,
    /// Error response
    Error(HfpError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = HfpOptions::default();
        assert_eq!(options.version, HfpVersion::V1_7);
        assert!(!options.wideband_speech);
    }
}
