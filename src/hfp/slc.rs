//! Service Level Connection establishment
//!
//! The SLC is the capability exchange a Hands-Free unit runs right after the
//! RFCOMM channel to the Audio Gateway opens. The steps are strictly ordered
//! and any failure aborts the whole procedure:
//!
//! 1. `AT+BRSF=<hf features>` exchanges feature bitmaps
//! 2. `AT+BAC=<codecs>` when both sides negotiate codecs
//! 3. `AT+CIND=?` maps indicator names to positions
//! 4. `AT+CIND?` reads the current indicator values
//! 5. `AT+CMER=3,0,0,1` enables indicator event reporting
//! 6. `AT+CHLD=?` when the AG supports three-way calling
//! 7. `AT+BIND=1,2`, `AT+BIND=?`, `AT+BIND?` when both sides support HF
//!    indicators
//!
//! After the last step `AT+CMEE=1` is posted without waiting for its result.

use core::fmt::Write;

use heapless::{String, Vec};

use super::features::{AgFeatures, ChldFeatures, HfFeatures};
use super::{
    HF_INDICATOR_BATTERY_LEVEL, HF_INDICATOR_ENHANCED_SAFETY, HfpError, HfpVersion, INDICATOR_COUNT,
    Indicator,
};
use crate::at::{AtChannel, AtResponse, AtResultIter};
use crate::constants::{
    BIND_PREFIX, BRSF_PREFIX, CHLD_PREFIX, CIND_PREFIX, HFP_CODEC_CVSD, HFP_CODEC_MSBC,
    MAX_AT_COMMAND_LENGTH, MAX_HF_INDICATORS,
};

/// Outcome of the capability exchange with the Audio Gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlcInfo {
    /// Profile version the Hands-Free side runs
    pub version: HfpVersion,
    /// Features advertised to the AG
    pub hf_features: HfFeatures,
    /// Features the AG advertised
    pub ag_features: AgFeatures,
    /// AG multiparty capabilities
    pub ag_mpty_features: ChldFeatures,
    /// 1-based `+CIND` column of each indicator, 0 when the AG lacks it
    pub cind_pos: [u8; INDICATOR_COUNT],
    /// Last known value of each indicator
    pub cind_val: [u8; INDICATOR_COUNT],
    /// HF indicator identifiers supported by the AG
    pub hf_indicators: Vec<u16, MAX_HF_INDICATORS>,
    /// Bit `i` set when `hf_indicators[i]` is enabled on the AG
    pub hf_indicator_active_map: u32,
}

impl SlcInfo {
    /// Create a fresh record with the HF feature set for `version`
    #[must_use]
    pub fn new(version: HfpVersion) -> Self {
        let mut hf_features = HfFeatures::from_raw(
            HfFeatures::THREE_WAY | HfFeatures::CLIP | HfFeatures::REMOTE_VOLUME,
        );
        if version >= HfpVersion::V1_5 {
            hf_features = hf_features
                .with(HfFeatures::ENHANCED_CALL_STATUS | HfFeatures::ENHANCED_CALL_CONTROL);
        }
        if version >= HfpVersion::V1_6 {
            hf_features = hf_features.with(HfFeatures::CODEC_NEGOTIATION);
        }
        if version >= HfpVersion::V1_7 {
            hf_features = hf_features.with(HfFeatures::HF_INDICATORS);
        }

        Self {
            version,
            hf_features,
            ag_features: AgFeatures::default(),
            ag_mpty_features: ChldFeatures::default(),
            cind_pos: [0; INDICATOR_COUNT],
            cind_val: [0; INDICATOR_COUNT],
            hf_indicators: Vec::new(),
            hf_indicator_active_map: 0,
        }
    }

    /// `+CIND` column of `indicator`, if the AG reported it
    #[must_use]
    pub fn indicator_position(&self, indicator: Indicator) -> Option<u8> {
        let pos = self.cind_pos[indicator.index()];
        (pos != 0).then_some(pos)
    }

    /// Last known value of `indicator`
    #[must_use]
    pub fn indicator_value(&self, indicator: Indicator) -> u8 {
        self.cind_val[indicator.index()]
    }

    /// Whether the AG enabled HF indicator `id`
    #[must_use]
    pub fn is_hf_indicator_active(&self, id: u16) -> bool {
        self.hf_indicators
            .iter()
            .position(|&known| known == id)
            .is_some_and(|i| self.hf_indicator_active_map & (1 << i) != 0)
    }

    /// Apply a `+BRSF: <features>` reply
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if the reply lacks the feature bitmap
    pub fn parse_brsf_response(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        let mut iter = AtResultIter::new(response);
        if !iter.next(BRSF_PREFIX) {
            return Err(HfpError::UnexpectedResponse(BRSF_PREFIX));
        }
        let features = iter
            .next_number()
            .ok_or(HfpError::UnexpectedResponse(BRSF_PREFIX))?;
        self.ag_features = AgFeatures::from_raw(features);
        Ok(())
    }

    /// Apply a `+CIND: ("name",(range)),...` reply, assigning indicator positions
    ///
    /// Only exact matches of the known indicator names get a position; columns
    /// are counted from 1.
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if a column is malformed
    pub fn parse_cind_support(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        const MALFORMED: HfpError = HfpError::UnexpectedResponse(CIND_PREFIX);

        let mut iter = AtResultIter::new(response);
        if !iter.next(CIND_PREFIX) {
            return Err(MALFORMED);
        }

        self.cind_pos = [0; INDICATOR_COUNT];
        let mut index: u32 = 1;
        while iter.open_list() {
            let name = iter.next_string().ok_or(MALFORMED)?;
            if !iter.open_list() {
                return Err(MALFORMED);
            }
            while iter.next_range().is_some() {}
            if !iter.close_list() || !iter.close_list() {
                return Err(MALFORMED);
            }

            if let (Some(indicator), Ok(pos)) = (Indicator::from_name(name), u8::try_from(index)) {
                self.cind_pos[indicator.index()] = pos;
            }
            index += 1;
        }
        Ok(())
    }

    /// Apply a `+CIND: v1,v2,...` reply using the positions from `AT+CIND=?`
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if the reply has no `+CIND:` line
    pub fn parse_cind_status(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        let mut iter = AtResultIter::new(response);
        if !iter.next(CIND_PREFIX) {
            return Err(HfpError::UnexpectedResponse(CIND_PREFIX));
        }

        let mut index: u32 = 1;
        while let Some(value) = iter.next_number() {
            for indicator in Indicator::ALL {
                let pos = self.cind_pos[indicator.index()];
                if pos != 0 && u32::from(pos) == index {
                    self.cind_val[indicator.index()] = u8::try_from(value).unwrap_or(u8::MAX);
                }
            }
            index += 1;
        }
        Ok(())
    }

    /// Apply a `+CHLD: (0,1,1x,...)` reply
    ///
    /// Some AGs quote each token; those are accepted as well.
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if the token list is not parenthesised
    pub fn parse_chld(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        const MALFORMED: HfpError = HfpError::UnexpectedResponse(CHLD_PREFIX);

        let mut iter = AtResultIter::new(response);
        if !iter.next(CHLD_PREFIX) || !iter.open_list() {
            return Err(MALFORMED);
        }

        let mut features = ChldFeatures::default();
        while let Some(token) = iter.next_unquoted_string().or_else(|| iter.next_string()) {
            features.insert_token(token);
        }
        if !iter.close_list() {
            return Err(MALFORMED);
        }

        self.ag_mpty_features = features;
        Ok(())
    }

    /// Apply a `+BIND: (1,2,...)` reply listing the AG's HF indicators
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if the list is malformed
    pub fn parse_bind_support(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        const MALFORMED: HfpError = HfpError::UnexpectedResponse(BIND_PREFIX);

        let mut iter = AtResultIter::new(response);
        if !iter.next(BIND_PREFIX) || !iter.open_list() {
            return Err(MALFORMED);
        }

        self.hf_indicators.clear();
        while let Some(id) = iter.next_number() {
            let Ok(id) = u16::try_from(id) else {
                continue;
            };
            if self.hf_indicators.push(id).is_err() {
                warn!("[SLC] AG lists more than {} HF indicators", MAX_HF_INDICATORS);
                break;
            }
        }
        if !iter.close_list() {
            return Err(MALFORMED);
        }
        Ok(())
    }

    /// Apply the `+BIND: <id>,<enabled>` lines of an `AT+BIND?` reply
    ///
    /// # Errors
    /// Returns [`HfpError::UnexpectedResponse`] if a line lacks either field
    pub fn parse_bind_status(&mut self, response: &AtResponse) -> Result<(), HfpError> {
        const MALFORMED: HfpError = HfpError::UnexpectedResponse(BIND_PREFIX);

        let mut iter = AtResultIter::new(response);
        self.hf_indicator_active_map = 0;
        while iter.next(BIND_PREFIX) {
            let id = iter.next_number().ok_or(MALFORMED)?;
            let enabled = iter.next_number().ok_or(MALFORMED)?;

            for (i, &known) in self.hf_indicators.iter().enumerate() {
                if u32::from(known) == id && enabled != 0 {
                    self.hf_indicator_active_map |= 1 << i;
                }
            }
        }
        Ok(())
    }
}

type Command = String<MAX_AT_COMMAND_LENGTH>;

/// Run the SLC procedure over `channel`, filling in `info`
///
/// `info` should come from [`SlcInfo::new`]; on failure it holds whatever was
/// learned before the failing step.
///
/// # Errors
/// Returns the first channel failure or malformed reply; no further commands
/// are sent after it.
pub async fn establish<C: AtChannel>(
    channel: &C,
    info: &mut SlcInfo,
    wideband_speech: bool,
) -> Result<(), HfpError> {
    info!("[SLC] Establishing service level connection");

    let mut command = Command::new();
    write!(command, "AT+BRSF={}", info.hf_features.raw())
        .map_err(|_| HfpError::InvalidParameter)?;
    let response = exchange(channel, &command, BRSF_PREFIX).await?;
    info.parse_brsf_response(&response)?;
    debug!("[SLC] AG features: {:#x}", info.ag_features.raw());

    if info.hf_features.codec_negotiation() && info.ag_features.codec_negotiation() {
        let codecs = if wideband_speech {
            codec_list(&[HFP_CODEC_CVSD, HFP_CODEC_MSBC])
        } else {
            codec_list(&[HFP_CODEC_CVSD])
        }?;
        exchange(channel, &codecs, "").await?;
    }

    let response = exchange(channel, "AT+CIND=?", CIND_PREFIX).await?;
    info.parse_cind_support(&response)?;

    let response = exchange(channel, "AT+CIND?", CIND_PREFIX).await?;
    info.parse_cind_status(&response)?;

    exchange(channel, "AT+CMER=3,0,0,1", "").await?;

    if info.ag_features.three_way_calling() {
        let response = exchange(channel, "AT+CHLD=?", CHLD_PREFIX).await?;
        info.parse_chld(&response)?;
        debug!("[SLC] AG CHLD features: {:#x}", info.ag_mpty_features.raw());
    }

    if info.hf_features.hf_indicators() && info.ag_features.hf_indicators() {
        let mut command = Command::new();
        write!(
            command,
            "AT+BIND={},{}",
            HF_INDICATOR_ENHANCED_SAFETY, HF_INDICATOR_BATTERY_LEVEL
        )
        .map_err(|_| HfpError::InvalidParameter)?;
        exchange(channel, &command, "").await?;

        let response = exchange(channel, "AT+BIND=?", BIND_PREFIX).await?;
        info.parse_bind_support(&response)?;

        let response = exchange(channel, "AT+BIND?", BIND_PREFIX).await?;
        info.parse_bind_status(&response)?;
    }

    if let Err(e) = channel.post("AT+CMEE=1") {
        warn!("[SLC] Failed to enable extended errors: {}", e);
    }

    info!("[SLC] Service level connection established");
    Ok(())
}

async fn exchange<C: AtChannel>(
    channel: &C,
    command: &str,
    prefix: &'static str,
) -> Result<AtResponse, HfpError> {
    let prefixes: &[&str] = if prefix.is_empty() { &[] } else { &[prefix] };
    channel.send(command, prefixes).await.map_err(|e| {
        error!("[SLC] {} failed: {}", command, e);
        HfpError::from(e)
    })
}

fn codec_list(codecs: &[u8]) -> Result<Command, HfpError> {
    let mut command = Command::new();
    command
        .push_str("AT+BAC=")
        .map_err(|()| HfpError::InvalidParameter)?;
    for (i, codec) in codecs.iter().enumerate() {
        if i > 0 {
            command.push(',').map_err(|()| HfpError::InvalidParameter)?;
        }
        write!(command, "{codec}").map_err(|_| HfpError::InvalidParameter)?;
    }
    Ok(command)
}
