//! HFP (Hands-Free Profile) Implementation
//!
//! This module implements the Hands-Free side of HFP over an AT command
//! channel carried on RFCOMM. The profile is split into two stages:
//!
//! - **Service Level Connection** ([`slc`]): the ordered capability exchange
//!   (`BRSF`, `BAC`, `CIND`, `CMER`, `CHLD`, `BIND`) that fills in [`SlcInfo`]
//! - **Handsfree Session** ([`handsfree`]): the post-SLC runtime that turns
//!   unsolicited result codes into [`HandsfreeEvent`]s and issues requests
//!   such as `AT+CNUM` or `AT+BVRA`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use callbird::hfp::{HfpVersion, SlcInfo, slc};
//!
//! let mut info = SlcInfo::new(HfpVersion::V1_7);
//! slc::establish(&channel, &mut info, false).await?;
//! ```

pub mod features;
pub mod handsfree;
pub mod slc;

pub use features::{AgFeatures, ChldFeatures, HfFeatures};
pub use handsfree::{HandsfreeEvent, HandsfreeSession, SubscriberNumber};
pub use slc::SlcInfo;

use crate::at::AtError;

/// HF indicator: enhanced safety
pub const HF_INDICATOR_ENHANCED_SAFETY: u16 = 1;

/// HF indicator: battery level
pub const HF_INDICATOR_BATTERY_LEVEL: u16 = 2;

/// Number of AG indicators tracked by [`Indicator`]
pub const INDICATOR_COUNT: usize = 7;

/// HFP errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HfpError {
    /// The AT channel reported a failure
    Channel(AtError),
    /// A reply did not carry the expected prefix or fields
    UnexpectedResponse(&'static str),
    /// Invalid parameter provided
    InvalidParameter,
    /// The processor answered with a response of the wrong kind
    UnexpectedReply,
}

impl core::fmt::Display for HfpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Channel(e) => write!(f, "{e}"),
            Self::UnexpectedResponse(prefix) => write!(f, "Malformed {prefix} response"),
            Self::InvalidParameter => write!(f, "Invalid parameter"),
            Self::UnexpectedReply => write!(f, "Unexpected reply from handsfree processor"),
        }
    }
}

impl From<AtError> for HfpError {
    fn from(e: AtError) -> Self {
        Self::Channel(e)
    }
}

/// Profile version implemented on the Hands-Free side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HfpVersion {
    /// HFP 1.0 - 1.4 feature baseline
    V1_0,
    /// HFP 1.5: enhanced call status and control
    V1_5,
    /// HFP 1.6: codec negotiation
    V1_6,
    /// HFP 1.7: HF indicators
    V1_7,
}

impl HfpVersion {
    /// Version as carried in SDP records (`0x0105` for 1.5)
    #[must_use]
    pub const fn raw(&self) -> u16 {
        match self {
            Self::V1_0 => 0x0100,
            Self::V1_5 => 0x0105,
            Self::V1_6 => 0x0106,
            Self::V1_7 => 0x0107,
        }
    }
}

/// AG indicators the Hands-Free side tracks by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Indicator {
    /// Network service availability
    Service = 0,
    /// Call in progress
    Call = 1,
    /// Call setup state
    CallSetup = 2,
    /// Call held state
    CallHeld = 3,
    /// Signal strength
    Signal = 4,
    /// Roaming state
    Roam = 5,
    /// Battery charge
    BattChg = 6,
}

impl Indicator {
    /// All indicators in table order
    pub const ALL: [Indicator; INDICATOR_COUNT] = [
        Self::Service,
        Self::Call,
        Self::CallSetup,
        Self::CallHeld,
        Self::Signal,
        Self::Roam,
        Self::BattChg,
    ];

    /// Match an AG indicator name exactly
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|indicator| indicator.name() == name)
    }

    /// Indicator name as reported in `+CIND=?`
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Call => "call",
            Self::CallSetup => "callsetup",
            Self::CallHeld => "callheld",
            Self::Signal => "signal",
            Self::Roam => "roam",
            Self::BattChg => "battchg",
        }
    }

    /// Index into indicator tables
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_names_are_exact() {
        assert_eq!(Indicator::from_name("battchg"), Some(Indicator::BattChg));
        assert_eq!(Indicator::from_name("callsetup"), Some(Indicator::CallSetup));
        assert_eq!(Indicator::from_name("call_setup"), None);
        assert_eq!(Indicator::from_name("Battchg"), None);
        assert_eq!(Indicator::from_name("batt"), None);
    }

    #[test]
    fn test_indicator_table_order() {
        for (i, indicator) in Indicator::ALL.iter().enumerate() {
            assert_eq!(indicator.index(), i);
        }
    }

    #[test]
    fn test_version_ordering() {
        assert!(HfpVersion::V1_0 < HfpVersion::V1_5);
        assert!(HfpVersion::V1_6 < HfpVersion::V1_7);
        assert_eq!(HfpVersion::V1_6.raw(), 0x0106);
    }

    #[test]
    fn test_error_conversion() {
        let error: HfpError = AtError::Timeout.into();
        assert_eq!(error, HfpError::Channel(AtError::Timeout));
    }
}
