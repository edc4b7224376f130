//! HFP supported feature bit fields
//!
//! The Hands-Free unit and the Audio Gateway each advertise a feature bitmap
//! in the `AT+BRSF` exchange, and the AG additionally reports its multiparty
//! (`+CHLD`) capabilities as a list of tokens. This module wraps all three in
//! small newtypes with named accessors and human-readable descriptions.
//!
//! ## Usage
//!
//! ```rust
//! use callbird::hfp::{AgFeatures, HfFeatures};
//!
//! let hf = HfFeatures::from_raw(HfFeatures::CLIP | HfFeatures::REMOTE_VOLUME);
//! assert!(hf.cli_presentation());
//!
//! let ag = AgFeatures::from_raw(0x0000_0369);
//! assert!(ag.three_way_calling());
//! ```

use heapless::Vec;

/// Hands-Free unit supported features (`AT+BRSF=<features>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HfFeatures {
    raw: u32,
}

impl HfFeatures {
    /// EC and/or NR function
    pub const ECNR: u32 = 0x0001;
    /// Call waiting and three-way calling
    pub const THREE_WAY: u32 = 0x0002;
    /// CLI presentation capability
    pub const CLIP: u32 = 0x0004;
    /// Voice recognition activation
    pub const VOICE_RECOGNITION: u32 = 0x0008;
    /// Remote volume control
    pub const REMOTE_VOLUME: u32 = 0x0010;
    /// Enhanced call status
    pub const ENHANCED_CALL_STATUS: u32 = 0x0020;
    /// Enhanced call control
    pub const ENHANCED_CALL_CONTROL: u32 = 0x0040;
    /// Codec negotiation
    pub const CODEC_NEGOTIATION: u32 = 0x0080;
    /// HF indicators
    pub const HF_INDICATORS: u32 = 0x0100;
    /// eSCO S4 (and T2) settings supported
    pub const ESCO_S4: u32 = 0x0200;

    const NAMES: [(u32, &'static str); 10] = [
        (Self::ECNR, "EC/NR"),
        (Self::THREE_WAY, "Three-way Calling"),
        (Self::CLIP, "CLI Presentation"),
        (Self::VOICE_RECOGNITION, "Voice Recognition"),
        (Self::REMOTE_VOLUME, "Remote Volume"),
        (Self::ENHANCED_CALL_STATUS, "Enhanced Call Status"),
        (Self::ENHANCED_CALL_CONTROL, "Enhanced Call Control"),
        (Self::CODEC_NEGOTIATION, "Codec Negotiation"),
        (Self::HF_INDICATORS, "HF Indicators"),
        (Self::ESCO_S4, "eSCO S4"),
    ];

    /// Create from a raw feature bitmap
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Get raw value
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    /// Check if every bit in `bits` is set
    #[must_use]
    pub const fn contains(&self, bits: u32) -> bool {
        self.raw & bits == bits
    }

    /// Copy with `bits` set
    #[must_use]
    pub const fn with(self, bits: u32) -> Self {
        Self {
            raw: self.raw | bits,
        }
    }

    /// Check if three-way calling is supported
    #[must_use]
    pub const fn three_way_calling(&self) -> bool {
        self.contains(Self::THREE_WAY)
    }

    /// Check if CLI presentation is supported
    #[must_use]
    pub const fn cli_presentation(&self) -> bool {
        self.contains(Self::CLIP)
    }

    /// Check if codec negotiation is supported
    #[must_use]
    pub const fn codec_negotiation(&self) -> bool {
        self.contains(Self::CODEC_NEGOTIATION)
    }

    /// Check if HF indicators are supported
    #[must_use]
    pub const fn hf_indicators(&self) -> bool {
        self.contains(Self::HF_INDICATORS)
    }

    /// Get descriptions of all advertised features
    #[must_use]
    pub fn descriptions(&self) -> Vec<&'static str, 10> {
        describe(self.raw, &Self::NAMES)
    }
}

impl core::fmt::Display for HfFeatures {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_list(f, &self.descriptions())
    }
}

/// Audio Gateway supported features (`+BRSF: <features>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AgFeatures {
    raw: u32,
}

impl AgFeatures {
    /// Three-way calling
    pub const THREE_WAY: u32 = 0x0001;
    /// EC and/or NR function
    pub const ECNR: u32 = 0x0002;
    /// Voice recognition function
    pub const VOICE_RECOGNITION: u32 = 0x0004;
    /// In-band ring tone capability
    pub const IN_BAND_RING_TONE: u32 = 0x0008;
    /// Attach a number to a voice tag
    pub const ATTACH_VOICE_TAG: u32 = 0x0010;
    /// Ability to reject a call
    pub const REJECT_CALL: u32 = 0x0020;
    /// Enhanced call status
    pub const ENHANCED_CALL_STATUS: u32 = 0x0040;
    /// Enhanced call control
    pub const ENHANCED_CALL_CONTROL: u32 = 0x0080;
    /// Extended error result codes
    pub const EXTENDED_ERRORS: u32 = 0x0100;
    /// Codec negotiation
    pub const CODEC_NEGOTIATION: u32 = 0x0200;
    /// HF indicators
    pub const HF_INDICATORS: u32 = 0x0400;
    /// eSCO S4 (and T2) settings supported
    pub const ESCO_S4: u32 = 0x0800;

    const NAMES: [(u32, &'static str); 12] = [
        (Self::THREE_WAY, "Three-way Calling"),
        (Self::ECNR, "EC/NR"),
        (Self::VOICE_RECOGNITION, "Voice Recognition"),
        (Self::IN_BAND_RING_TONE, "In-band Ring Tone"),
        (Self::ATTACH_VOICE_TAG, "Voice Tag"),
        (Self::REJECT_CALL, "Reject Call"),
        (Self::ENHANCED_CALL_STATUS, "Enhanced Call Status"),
        (Self::ENHANCED_CALL_CONTROL, "Enhanced Call Control"),
        (Self::EXTENDED_ERRORS, "Extended Errors"),
        (Self::CODEC_NEGOTIATION, "Codec Negotiation"),
        (Self::HF_INDICATORS, "HF Indicators"),
        (Self::ESCO_S4, "eSCO S4"),
    ];

    /// Create from a raw feature bitmap
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Get raw value
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    /// Check if every bit in `bits` is set
    #[must_use]
    pub const fn contains(&self, bits: u32) -> bool {
        self.raw & bits == bits
    }

    /// Check if three-way calling is supported
    #[must_use]
    pub const fn three_way_calling(&self) -> bool {
        self.contains(Self::THREE_WAY)
    }

    /// Check if the AG plays its own ring tone over SCO
    #[must_use]
    pub const fn in_band_ring_tone(&self) -> bool {
        self.contains(Self::IN_BAND_RING_TONE)
    }

    /// Check if codec negotiation is supported
    #[must_use]
    pub const fn codec_negotiation(&self) -> bool {
        self.contains(Self::CODEC_NEGOTIATION)
    }

    /// Check if HF indicators are supported
    #[must_use]
    pub const fn hf_indicators(&self) -> bool {
        self.contains(Self::HF_INDICATORS)
    }

    /// Get descriptions of all advertised features
    #[must_use]
    pub fn descriptions(&self) -> Vec<&'static str, 12> {
        describe(self.raw, &Self::NAMES)
    }
}

impl core::fmt::Display for AgFeatures {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_list(f, &self.descriptions())
    }
}

/// AG multiparty call handling capabilities (`+CHLD: (...)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChldFeatures {
    raw: u32,
}

impl ChldFeatures {
    /// `0`: release all held calls or reject waiting call
    pub const RELEASE_HELD: u32 = 0x01;
    /// `1`: release active calls and accept the other call
    pub const RELEASE_ACTIVE_ACCEPT: u32 = 0x02;
    /// `1x`: release a specific call
    pub const RELEASE_SPECIFIC: u32 = 0x04;
    /// `2`: hold active calls and accept the other call
    pub const HOLD_ACTIVE_ACCEPT: u32 = 0x08;
    /// `2x`: private consultation with a specific call
    pub const PRIVATE_CHAT: u32 = 0x10;
    /// `3`: add a held call to the conversation
    pub const MERGE: u32 = 0x20;
    /// `4`: connect the two calls and disconnect the subscriber
    pub const MERGE_DETACH: u32 = 0x40;

    const TOKENS: [(&'static str, u32); 7] = [
        ("0", Self::RELEASE_HELD),
        ("1", Self::RELEASE_ACTIVE_ACCEPT),
        ("1x", Self::RELEASE_SPECIFIC),
        ("2", Self::HOLD_ACTIVE_ACCEPT),
        ("2x", Self::PRIVATE_CHAT),
        ("3", Self::MERGE),
        ("4", Self::MERGE_DETACH),
    ];

    /// Create from a raw capability bitmap
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Get raw value
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    /// Check if every bit in `bits` is set
    #[must_use]
    pub const fn contains(&self, bits: u32) -> bool {
        self.raw & bits == bits
    }

    /// Bit for a `+CHLD` token, matched exactly
    #[must_use]
    pub fn token_bit(token: &str) -> Option<u32> {
        Self::TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|&(_, bit)| bit)
    }

    /// Set the bit for `token`; unknown tokens are ignored
    pub fn insert_token(&mut self, token: &str) {
        if let Some(bit) = Self::token_bit(token) {
            self.raw |= bit;
        }
    }

    /// Get the `+CHLD` tokens this bitmap stands for
    #[must_use]
    pub fn tokens(&self) -> Vec<&'static str, 7> {
        let mut tokens = Vec::new();
        for (token, bit) in Self::TOKENS {
            if self.contains(bit) {
                let _ = tokens.push(token);
            }
        }
        tokens
    }
}

impl core::fmt::Display for ChldFeatures {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_list(f, &self.tokens())
    }
}

fn describe<const N: usize>(raw: u32, names: &[(u32, &'static str); N]) -> Vec<&'static str, N> {
    let mut descriptions = Vec::new();
    for &(bit, name) in names {
        if raw & bit != 0 {
            let _ = descriptions.push(name);
        }
    }
    descriptions
}

fn write_list(f: &mut core::fmt::Formatter<'_>, items: &[&str]) -> core::fmt::Result {
    if items.is_empty() {
        return write!(f, "None");
    }
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn test_hf_features_accessors() {
        let hf = HfFeatures::from_raw(HfFeatures::THREE_WAY | HfFeatures::CLIP)
            .with(HfFeatures::HF_INDICATORS);
        assert!(hf.three_way_calling());
        assert!(hf.cli_presentation());
        assert!(hf.hf_indicators());
        assert!(!hf.codec_negotiation());
        assert_eq!(hf.raw(), 0x0106);
    }

    #[test]
    fn test_ag_features_descriptions() {
        let ag = AgFeatures::from_raw(AgFeatures::THREE_WAY | AgFeatures::IN_BAND_RING_TONE);
        assert!(ag.in_band_ring_tone());
        assert_eq!(
            ag.descriptions().as_slice(),
            &["Three-way Calling", "In-band Ring Tone"]
        );

        let mut buffer = heapless::String::<64>::new();
        write!(buffer, "{ag}").unwrap();
        assert_eq!(buffer.as_str(), "Three-way Calling, In-band Ring Tone");
    }

    #[test]
    fn test_empty_features_display() {
        let mut buffer = heapless::String::<16>::new();
        write!(buffer, "{}", AgFeatures::default()).unwrap();
        assert_eq!(buffer.as_str(), "None");
    }

    #[test]
    fn test_chld_tokens() {
        let mut chld = ChldFeatures::default();
        for token in ["0", "1", "1x", "2", "2x", "3", "4"] {
            chld.insert_token(token);
        }
        assert_eq!(chld.raw(), 0x7F);

        let mut partial = ChldFeatures::default();
        partial.insert_token("2x");
        partial.insert_token("5");
        partial.insert_token("1X");
        assert_eq!(partial.raw(), ChldFeatures::PRIVATE_CHAT);
        assert_eq!(partial.tokens().as_slice(), &["2x"]);
    }
}
