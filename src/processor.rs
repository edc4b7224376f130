//! Processor Task - Handsfree link processing
//!
//! This module contains the task that owns a handsfree link. It establishes
//! the service level connection, creates the [`HandsfreeSession`], and then
//! serves unsolicited result codes and API requests until the link fails.
//!
//! # Usage
//!
//! The processor should be spawned as an Embassy task next to the AT
//! channel's own reader task:
//!
//! ```rust,ignore
//! use callbird::{HandsfreeControl, HfpOptions, processor};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!
//! static HANDSFREE: HandsfreeControl<CriticalSectionRawMutex> = HandsfreeControl::new();
//!
//! #[embassy_executor::task]
//! async fn handsfree_task(channel: &'static MyAtChannel, ag: BluetoothAddress) {
//!     if let Err(e) = processor::run(channel, ag, HfpOptions::default(), &HANDSFREE).await {
//!         // SLC failed or the channel went away
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! * **SLC**: runs once; any failure ends the task before a session exists
//! * **Registration**: deferred to the first scheduling point after the SLC
//! * **Event loop**: `select` over unsolicited lines and API requests

use core::convert::Infallible;

use crate::address::BluetoothAddress;
use crate::api::HandsfreeControl;
use crate::at::AtChannel;
use crate::hfp::{HandsfreeEvent, HandsfreeSession, HfpError, SlcInfo, slc};
use crate::{HfpOptions, Request, Response};
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Run the handsfree link over `channel`
///
/// Only returns on failure: either the SLC could not be established, or the
/// session could not register for unsolicited result codes.
///
/// # Errors
///
/// Returns the [`HfpError`] that ended the link.
pub async fn run<C: AtChannel, M: RawMutex>(
    channel: &C,
    address: BluetoothAddress,
    options: HfpOptions,
    control: &HandsfreeControl<M>,
) -> Result<Infallible, HfpError> {
    info!("[PROCESSOR] Connecting to AG {}", address);

    let mut info = SlcInfo::new(options.version);
    if let Err(e) = slc::establish(channel, &mut info, options.wideband_speech).await {
        error!("[PROCESSOR] SLC failed: {}", e);
        return Err(e);
    }

    let mut session = HandsfreeSession::new(channel, address, &info);
    embassy_futures::yield_now().await;
    for event in session.register()? {
        publish(control, event);
    }

    loop {
        match select(channel.unsolicited(), control.requests.receive()).await {
            Either::First(line) => {
                if let Some(event) = session.handle_unsolicited(&line) {
                    publish(control, event);
                }
            }
            Either::Second(request) => {
                debug!("[PROCESSOR] API request: {}", request);
                let response = process_request(&session, request).await;
                control.responses.send(response).await;
            }
        }
    }
}

fn publish<M: RawMutex>(control: &HandsfreeControl<M>, event: HandsfreeEvent) {
    if control.events.try_send(event).is_err() {
        warn!("[PROCESSOR] Event queue full, dropping event");
    }
}

async fn process_request<C: AtChannel>(
    session: &HandsfreeSession<'_, C>,
    request: Request,
) -> Response {
    let result = match request {
        Request::SubscriberNumbers => session
            .subscriber_numbers()
            .await
            .map(Response::SubscriberNumbers),
        Request::PhoneNumber => session
            .request_phone_number()
            .await
            .map(Response::PhoneNumber),
        Request::VoiceRecognition(enabled) => session
            .set_voice_recognition(enabled)
            .await
            .map(|()| Response::Done),
        Request::DisableNrec => session.disable_nrec().await.map(|()| Response::Done),
        Request::HfIndicator { id, value } => session
            .send_hf_indicator(id, value)
            .await
            .map(|()| Response::Done),
    };

    result.unwrap_or_else(|e| {
        warn!("[PROCESSOR] Request failed: {}", e);
        Response::Error(e)
    })
}
