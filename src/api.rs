//! `Callbird` API Functions
//!
//! This module provides the application-facing side of a handsfree link.
//! A [`HandsfreeControl`] carries requests to the task running
//! [`crate::processor::run`], its responses, and the events the session
//! publishes. Place one in a `static` with a `CriticalSectionRawMutex` in
//! firmware; tests use a `NoopRawMutex` on the stack.
//!
//! # Usage
//!
//! ```rust,ignore
//! use callbird::HandsfreeControl;
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!
//! static HANDSFREE: HandsfreeControl<CriticalSectionRawMutex> = HandsfreeControl::new();
//!
//! // Own numbers of the phone
//! let numbers = HANDSFREE.subscriber_numbers().await?;
//!
//! // Battery level, voice recognition state, ...
//! let event = HANDSFREE.next_event().await;
//! ```

use crate::constants::{MAX_CHANNELS, MAX_SUBSCRIBER_NUMBERS};
use crate::hfp::{HandsfreeEvent, HfpError, SubscriberNumber};
use crate::{Request, Response};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Request, response and event channels of one handsfree link
pub struct HandsfreeControl<M: RawMutex> {
    pub(crate) requests: Channel<M, Request, MAX_CHANNELS>,
    pub(crate) responses: Channel<M, Response, MAX_CHANNELS>,
    pub(crate) events: Channel<M, HandsfreeEvent, MAX_CHANNELS>,
}

impl<M: RawMutex> Default for HandsfreeControl<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> HandsfreeControl<M> {
    /// Create empty channels
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            responses: Channel::new(),
            events: Channel::new(),
        }
    }

    async fn request(&self, request: Request) -> Response {
        self.requests.sender().send(request).await;
        self.responses.receiver().receive().await
    }

    /// Get the subscriber numbers of the Audio Gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if `AT+CNUM` fails or the response is unexpected.
    pub async fn subscriber_numbers(
        &self,
    ) -> Result<Vec<SubscriberNumber, MAX_SUBSCRIBER_NUMBERS>, HfpError> {
        match self.request(Request::SubscriberNumbers).await {
            Response::SubscriberNumbers(numbers) => Ok(numbers),
            Response::Error(e) => Err(e),
            _ => Err(HfpError::UnexpectedReply),
        }
    }

    /// Ask the Audio Gateway for a number to attach to a voice tag.
    ///
    /// # Errors
    ///
    /// Returns an error if `AT+BINP` fails, the reply is malformed, or the response is unexpected.
    pub async fn request_phone_number(&self) -> Result<SubscriberNumber, HfpError> {
        match self.request(Request::PhoneNumber).await {
            Response::PhoneNumber(number) => Ok(number),
            Response::Error(e) => Err(e),
            _ => Err(HfpError::UnexpectedReply),
        }
    }

    /// Start or stop voice recognition.
    ///
    /// # Errors
    ///
    /// Returns an error if the Audio Gateway refuses or the response is unexpected.
    pub async fn set_voice_recognition(&self, enabled: bool) -> Result<(), HfpError> {
        self.expect_done(Request::VoiceRecognition(enabled)).await
    }

    /// Disable echo cancelling and noise reduction on the Audio Gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the Audio Gateway refuses or the response is unexpected.
    pub async fn disable_nrec(&self) -> Result<(), HfpError> {
        self.expect_done(Request::DisableNrec).await
    }

    /// Report an HF indicator value.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator is not enabled, the Audio Gateway refuses, or the
    /// response is unexpected.
    pub async fn send_hf_indicator(&self, id: u16, value: u32) -> Result<(), HfpError> {
        self.expect_done(Request::HfIndicator { id, value }).await
    }

    async fn expect_done(&self, request: Request) -> Result<(), HfpError> {
        match self.request(request).await {
            Response::Done => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(HfpError::UnexpectedReply),
        }
    }

    /// Wait for the next event published by the session
    pub async fn next_event(&self) -> HandsfreeEvent {
        self.events.receiver().receive().await
    }

    /// Take a published event if one is waiting
    pub fn try_next_event(&self) -> Option<HandsfreeEvent> {
        self.events.try_receive().ok()
    }
}
