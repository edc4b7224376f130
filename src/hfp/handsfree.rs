//! Handsfree session
//!
//! A [`HandsfreeSession`] is created from a finished [`SlcInfo`] and drives
//! the Audio Gateway for the lifetime of the service level connection. It
//! turns unsolicited result codes into [`HandsfreeEvent`]s and implements the
//! request side of the profile (subscriber number, voice tag number, voice
//! recognition, echo cancelling and HF indicator reports).

use core::fmt::Write;

use heapless::{String, Vec};

use super::features::{AgFeatures, ChldFeatures};
use super::slc::SlcInfo;
use super::{HfpError, Indicator};
use crate::address::BluetoothAddress;
use crate::at::{AtChannel, AtLine, AtResultIter};
use crate::constants::{
    BINP_PREFIX, BIND_PREFIX, BSIR_PREFIX, BVRA_PREFIX, CIEV_PREFIX, CNUM_PREFIX,
    CNUM_SERVICE_VOICE, MAX_AT_COMMAND_LENGTH, MAX_HF_INDICATORS, MAX_PHONE_NUMBER_LENGTH,
    MAX_SUBSCRIBER_NUMBERS,
};

/// Unsolicited prefixes a session listens to
pub const UNSOLICITED_PREFIXES: [&str; 4] = [BSIR_PREFIX, BVRA_PREFIX, CIEV_PREFIX, BIND_PREFIX];

/// Phone number as reported by the AG
pub type PhoneNumber = String<MAX_PHONE_NUMBER_LENGTH>;

/// A number with its `<type>` field (129 national, 145 international)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberNumber {
    /// Dialable number
    pub number: PhoneNumber,
    /// Type of address octet
    pub number_type: u8,
}

/// Published session state and AG notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandsfreeEvent {
    /// AG supported features
    AgFeatures(AgFeatures),
    /// AG multiparty capabilities
    ChldFeatures(ChldFeatures),
    /// HF indicators the AG supports, with their enabled bitmap
    HfIndicators {
        /// Indicator identifiers
        ids: Vec<u16, MAX_HF_INDICATORS>,
        /// Bit `i` set when `ids[i]` is enabled
        active_map: u32,
    },
    /// AG plays its own ring tone in-band
    InBandRinging(bool),
    /// AG started or stopped voice recognition
    VoiceRecognition(bool),
    /// AG battery level changed
    BatteryLevel(u8),
    /// AG enabled or disabled an HF indicator
    HfIndicatorState {
        /// Indicator identifier
        id: u16,
        /// Whether reports are now wanted
        enabled: bool,
    },
}

/// Post-SLC handsfree driver
pub struct HandsfreeSession<'a, C: AtChannel> {
    channel: &'a C,
    address: BluetoothAddress,
    ag_features: AgFeatures,
    ag_chld_features: ChldFeatures,
    battchg_pos: u8,
    hf_indicators: Vec<u16, MAX_HF_INDICATORS>,
    hf_indicator_active_map: u32,
    registered: bool,
}

type Command = String<MAX_AT_COMMAND_LENGTH>;

impl<'a, C: AtChannel> HandsfreeSession<'a, C> {
    /// Create a session for the AG at `address`
    ///
    /// The session does not listen to anything until [`Self::register`] runs.
    pub fn new(channel: &'a C, address: BluetoothAddress, info: &SlcInfo) -> Self {
        Self {
            channel,
            address,
            ag_features: info.ag_features,
            ag_chld_features: info.ag_mpty_features,
            battchg_pos: info.indicator_position(Indicator::BattChg).unwrap_or(0),
            hf_indicators: info.hf_indicators.clone(),
            hf_indicator_active_map: info.hf_indicator_active_map,
            registered: false,
        }
    }

    /// Address of the Audio Gateway
    #[must_use]
    pub fn address(&self) -> BluetoothAddress {
        self.address
    }

    /// Whether [`Self::register`] has completed
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Subscribe to unsolicited codes and return the initial state to publish
    ///
    /// # Errors
    /// Returns [`HfpError::Channel`] if a prefix cannot be registered
    pub fn register(&mut self) -> Result<Vec<HandsfreeEvent, 4>, HfpError> {
        for prefix in UNSOLICITED_PREFIXES {
            self.channel.register(prefix)?;
        }
        self.registered = true;

        let mut events = Vec::new();
        if self.ag_features.in_band_ring_tone() {
            let _ = events.push(HandsfreeEvent::InBandRinging(true));
        }
        let _ = events.push(HandsfreeEvent::AgFeatures(self.ag_features));
        let _ = events.push(HandsfreeEvent::ChldFeatures(self.ag_chld_features));
        let _ = events.push(HandsfreeEvent::HfIndicators {
            ids: self.hf_indicators.clone(),
            active_map: self.hf_indicator_active_map,
        });

        info!("[HANDSFREE] Registered, AG features {:#x}", self.ag_features.raw());
        Ok(events)
    }

    /// Translate an unsolicited line into an event
    ///
    /// Malformed lines and indicators other than battery charge yield `None`.
    pub fn handle_unsolicited(&mut self, line: &AtLine) -> Option<HandsfreeEvent> {
        let mut iter = AtResultIter::for_line(line);
        if iter.next(CIEV_PREFIX) {
            let index = iter.next_number()?;
            if self.battchg_pos == 0 || index != u32::from(self.battchg_pos) {
                return None;
            }
            let value = iter.next_number()?;
            return Some(HandsfreeEvent::BatteryLevel(
                u8::try_from(value).unwrap_or(u8::MAX),
            ));
        }

        let mut iter = AtResultIter::for_line(line);
        if iter.next(BSIR_PREFIX) {
            let value = iter.next_number()?;
            return Some(HandsfreeEvent::InBandRinging(value != 0));
        }

        let mut iter = AtResultIter::for_line(line);
        if iter.next(BVRA_PREFIX) {
            let value = iter.next_number()?;
            return Some(HandsfreeEvent::VoiceRecognition(value != 0));
        }

        let mut iter = AtResultIter::for_line(line);
        if iter.next(BIND_PREFIX) {
            let id = u16::try_from(iter.next_number()?).ok()?;
            let enabled = iter.next_number()? != 0;
            let i = self.hf_indicators.iter().position(|&known| known == id)?;
            if enabled {
                self.hf_indicator_active_map |= 1 << i;
            } else {
                self.hf_indicator_active_map &= !(1 << i);
            }
            return Some(HandsfreeEvent::HfIndicatorState { id, enabled });
        }

        debug!("[HANDSFREE] Ignoring unsolicited line");
        None
    }

    /// Query the subscriber numbers (`AT+CNUM`)
    ///
    /// Only voice service entries are returned; malformed entries are skipped.
    ///
    /// # Errors
    /// Returns [`HfpError::Channel`] if the command fails
    pub async fn subscriber_numbers(
        &self,
    ) -> Result<Vec<SubscriberNumber, MAX_SUBSCRIBER_NUMBERS>, HfpError> {
        let response = self.channel.send("AT+CNUM", &[CNUM_PREFIX]).await?;

        let mut numbers = Vec::new();
        let mut iter = AtResultIter::new(&response);
        while iter.next(CNUM_PREFIX) {
            // +CNUM: [<alpha>],<number>,<type>,[<speed>,<service>]
            if !iter.skip_next() {
                continue;
            }
            let Some(number) = iter.next_string() else {
                continue;
            };
            let Some(number_type) = iter.next_number() else {
                continue;
            };
            if !iter.skip_next() {
                continue;
            }
            let Some(service) = iter.next_number() else {
                continue;
            };
            if service != CNUM_SERVICE_VOICE {
                continue;
            }

            let Ok(number) = PhoneNumber::try_from(number) else {
                warn!("[HANDSFREE] Subscriber number too long");
                continue;
            };
            let entry = SubscriberNumber {
                number,
                number_type: u8::try_from(number_type).unwrap_or(u8::MAX),
            };
            if numbers.push(entry).is_err() {
                break;
            }
        }

        debug!("[HANDSFREE] {} subscriber numbers", numbers.len());
        Ok(numbers)
    }

    /// Ask the AG for a number to attach to a voice tag (`AT+BINP=1`)
    ///
    /// # Errors
    /// Returns [`HfpError::Channel`] if the command fails or
    /// [`HfpError::UnexpectedResponse`] if the reply lacks the number or its type
    pub async fn request_phone_number(&self) -> Result<SubscriberNumber, HfpError> {
        const MALFORMED: HfpError = HfpError::UnexpectedResponse(BINP_PREFIX);

        let response = self.channel.send("AT+BINP=1", &[BINP_PREFIX]).await?;
        let mut iter = AtResultIter::new(&response);
        if !iter.next(BINP_PREFIX) {
            return Err(MALFORMED);
        }
        let number = iter.next_string().ok_or(MALFORMED)?;
        let number_type = iter.next_number().ok_or(MALFORMED)?;

        Ok(SubscriberNumber {
            number: PhoneNumber::try_from(number).map_err(|()| MALFORMED)?,
            number_type: u8::try_from(number_type).map_err(|_| MALFORMED)?,
        })
    }

    /// Start or stop voice recognition on the AG (`AT+BVRA`)
    ///
    /// # Errors
    /// Returns [`HfpError::Channel`] if the AG refuses
    pub async fn set_voice_recognition(&self, enabled: bool) -> Result<(), HfpError> {
        let mut command = Command::new();
        write!(command, "AT+BVRA={}", u8::from(enabled))
            .map_err(|_| HfpError::InvalidParameter)?;
        self.channel.send(&command, &[]).await?;
        Ok(())
    }

    /// Turn off echo cancelling and noise reduction on the AG (`AT+NREC=0`)
    ///
    /// # Errors
    /// Returns [`HfpError::Channel`] if the AG refuses
    pub async fn disable_nrec(&self) -> Result<(), HfpError> {
        self.channel.send("AT+NREC=0", &[]).await?;
        Ok(())
    }

    /// Report an HF indicator value (`AT+BIEV`)
    ///
    /// # Errors
    /// Returns [`HfpError::InvalidParameter`] if the AG has not enabled `id`,
    /// or [`HfpError::Channel`] if the AG refuses
    pub async fn send_hf_indicator(&self, id: u16, value: u32) -> Result<(), HfpError> {
        let enabled = self
            .hf_indicators
            .iter()
            .position(|&known| known == id)
            .is_some_and(|i| self.hf_indicator_active_map & (1 << i) != 0);
        if !enabled {
            warn!("[HANDSFREE] HF indicator {} is not enabled", id);
            return Err(HfpError::InvalidParameter);
        }

        let mut command = Command::new();
        write!(command, "AT+BIEV={id},{value}")
            .map_err(|_| HfpError::InvalidParameter)?;
        self.channel.send(&command, &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at::AtError;
    use crate::hfp::{HF_INDICATOR_BATTERY_LEVEL, HfpVersion};
    use crate::mock::ScriptedChannel;
    use embassy_futures::block_on;

    const AG: BluetoothAddress = BluetoothAddress::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);

    fn slc_info() -> SlcInfo {
        let mut info = SlcInfo::new(HfpVersion::V1_7);
        info.ag_features =
            AgFeatures::from_raw(AgFeatures::THREE_WAY | AgFeatures::IN_BAND_RING_TONE);
        info.ag_mpty_features = ChldFeatures::from_raw(0x2B);
        info.cind_pos[Indicator::Signal.index()] = 5;
        info.cind_pos[Indicator::BattChg.index()] = 7;
        info.hf_indicators = Vec::from_slice(&[1, 2]).unwrap();
        info.hf_indicator_active_map = 0b10;
        info
    }

    fn line(text: &str) -> AtLine {
        AtLine::try_from(text).unwrap()
    }

    #[test]
    fn test_register_publishes_state() {
        let channel = ScriptedChannel::new();
        let mut session = HandsfreeSession::new(&channel, AG, &slc_info());
        assert!(!session.is_registered());
        assert!(channel.registered().is_empty());

        let events = session.register().unwrap();
        assert!(session.is_registered());
        assert_eq!(channel.registered().as_slice(), &UNSOLICITED_PREFIXES);
        assert_eq!(events[0], HandsfreeEvent::InBandRinging(true));
        assert_eq!(events[2], HandsfreeEvent::ChldFeatures(ChldFeatures::from_raw(0x2B)));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_register_without_in_band_ringing() {
        let channel = ScriptedChannel::new();
        let mut info = slc_info();
        info.ag_features = AgFeatures::from_raw(AgFeatures::THREE_WAY);
        let mut session = HandsfreeSession::new(&channel, AG, &info);

        let events = session.register().unwrap();
        assert_eq!(events.len(), 3);
        assert!(!events.contains(&HandsfreeEvent::InBandRinging(true)));
    }

    #[test]
    fn test_ciev_only_reports_battery() {
        let channel = ScriptedChannel::new();
        let mut session = HandsfreeSession::new(&channel, AG, &slc_info());

        assert_eq!(
            session.handle_unsolicited(&line("+CIEV: 7,3")),
            Some(HandsfreeEvent::BatteryLevel(3))
        );
        assert_eq!(session.handle_unsolicited(&line("+CIEV: 5,3")), None);
        assert_eq!(session.handle_unsolicited(&line("+CIEV: 7")), None);
        assert_eq!(session.handle_unsolicited(&line("+CIEV: x,1")), None);
    }

    #[test]
    fn test_ciev_without_battchg_column() {
        let channel = ScriptedChannel::new();
        let mut info = slc_info();
        info.cind_pos[Indicator::BattChg.index()] = 0;
        let mut session = HandsfreeSession::new(&channel, AG, &info);

        assert_eq!(session.handle_unsolicited(&line("+CIEV: 0,3")), None);
    }

    #[test]
    fn test_other_unsolicited_codes() {
        let channel = ScriptedChannel::new();
        let mut session = HandsfreeSession::new(&channel, AG, &slc_info());

        assert_eq!(
            session.handle_unsolicited(&line("+BSIR: 0")),
            Some(HandsfreeEvent::InBandRinging(false))
        );
        assert_eq!(
            session.handle_unsolicited(&line("+BVRA: 1")),
            Some(HandsfreeEvent::VoiceRecognition(true))
        );
        assert_eq!(
            session.handle_unsolicited(&line("+BIND: 1,1")),
            Some(HandsfreeEvent::HfIndicatorState { id: 1, enabled: true })
        );
        assert_eq!(session.handle_unsolicited(&line("+BIND: 9,1")), None);
        assert_eq!(session.handle_unsolicited(&line("+XYZ: 1")), None);
    }

    #[test]
    fn test_subscriber_numbers_filters_voice() {
        let channel = ScriptedChannel::new();
        channel.expect(
            "AT+CNUM",
            &[
                "+CNUM: ,\"+15551234567\",145,,4",
                "+CNUM: \"fax\",\"5550000\",129,,2",
                "+CNUM: ,\"5559876\",129,,4",
                "+CNUM: ,5551111,129,,4",
            ],
        );
        let session = HandsfreeSession::new(&channel, AG, &slc_info());

        let numbers = block_on(session.subscriber_numbers()).unwrap();
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].number.as_str(), "+15551234567");
        assert_eq!(numbers[0].number_type, 145);
        assert_eq!(numbers[1].number.as_str(), "5559876");
        assert_eq!(numbers[1].number_type, 129);
    }

    #[test]
    fn test_subscriber_numbers_empty_and_failing() {
        let channel = ScriptedChannel::new();
        channel
            .expect("AT+CNUM", &[])
            .expect_error("AT+CNUM", AtError::Error);
        let session = HandsfreeSession::new(&channel, AG, &slc_info());

        assert!(block_on(session.subscriber_numbers()).unwrap().is_empty());
        assert_eq!(
            block_on(session.subscriber_numbers()),
            Err(HfpError::Channel(AtError::Error))
        );
    }

    #[test]
    fn test_request_phone_number() {
        let channel = ScriptedChannel::new();
        channel
            .expect("AT+BINP=1", &["+BINP: \"+441234567890\",145"])
            .expect("AT+BINP=1", &["+BINP: \"+441234567890\""]);
        let session = HandsfreeSession::new(&channel, AG, &slc_info());

        let number = block_on(session.request_phone_number()).unwrap();
        assert_eq!(number.number.as_str(), "+441234567890");
        assert_eq!(number.number_type, 145);

        assert_eq!(
            block_on(session.request_phone_number()),
            Err(HfpError::UnexpectedResponse(BINP_PREFIX))
        );
    }

    #[test]
    fn test_simple_commands() {
        let channel = ScriptedChannel::new();
        channel
            .expect("AT+BVRA=1", &[])
            .expect("AT+NREC=0", &[])
            .expect("AT+BIEV=2,80", &[]);
        let session = HandsfreeSession::new(&channel, AG, &slc_info());

        block_on(session.set_voice_recognition(true)).unwrap();
        block_on(session.disable_nrec()).unwrap();
        block_on(session.send_hf_indicator(HF_INDICATOR_BATTERY_LEVEL, 80)).unwrap();
        assert_eq!(
            block_on(session.send_hf_indicator(1, 1)),
            Err(HfpError::InvalidParameter)
        );
        assert!(channel.script_done());
    }
}
