//! Non-blocking push queue between tick handlers and an async BLE task.
//!
//! Tick handlers run synchronously and may not wait, while async hosts send
//! notifications and indications from a task. [`PushQueue`] implements
//! [`Transport`] by queueing the request without waiting; the BLE task
//! drains it with [`PushQueue::receive`].
use core::cell::Cell;

use bt_hci::param::ConnHandle;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::config;
use crate::transport::{AckMode, Payload, Transport, MAX_PAYLOAD};
use crate::Error;

/// A queued value push.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PushRequest {
    /// Target link.
    pub link: ConnHandle,
    /// Attribute value handle.
    pub handle: u16,
    /// Acknowledgement mode.
    pub mode: AckMode,
    /// Value bytes.
    pub value: Vec<u8, MAX_PAYLOAD>,
}

/// Push queue using the build-time queue depth.
pub type DefaultPushQueue<M> = PushQueue<M, { config::PUSH_QUEUE_SIZE }>;

/// Bounded queue of at most `N` pending pushes.
///
/// Only one indication may be outstanding: from the moment an indication is
/// queued until the BLE task reports [`indication_confirmed`] or
/// [`indication_failed`], further indications are refused with
/// [`Error::IndicationPending`]. Notifications are not affected.
///
/// [`indication_confirmed`]: PushQueue::indication_confirmed
/// [`indication_failed`]: PushQueue::indication_failed
pub struct PushQueue<M: RawMutex, const N: usize> {
    channel: Channel<M, PushRequest, N>,
    indication_pending: Mutex<M, Cell<bool>>,
}

impl<M: RawMutex, const N: usize> PushQueue<M, N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            indication_pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Wait for the next push request.
    pub async fn receive(&self) -> PushRequest {
        self.channel.receive().await
    }

    /// Take the next push request, if any.
    pub fn try_receive(&self) -> Option<PushRequest> {
        self.channel.try_receive().ok()
    }

    /// The peer confirmed the outstanding indication.
    pub fn indication_confirmed(&self) {
        trace!("[queue] indication confirmed");
        self.indication_pending.lock(|pending| pending.set(false));
    }

    /// The outstanding indication could not be sent or was never confirmed.
    pub fn indication_failed(&self) {
        debug!("[queue] indication failed");
        self.indication_pending.lock(|pending| pending.set(false));
    }

    /// Whether an indication is waiting for confirmation.
    pub fn is_indication_pending(&self) -> bool {
        self.indication_pending.lock(|pending| pending.get())
    }

    /// Drop every queued request and forget the outstanding indication.
    ///
    /// Called when the link goes down: nothing is kept for the next peer.
    pub fn clear(&self) {
        let mut dropped = 0u32;
        while self.channel.try_receive().is_ok() {
            dropped += 1;
        }
        self.indication_pending.lock(|pending| pending.set(false));
        if dropped > 0 {
            debug!("[queue] cleared {} pending pushes", dropped);
        }
    }
}

impl<M: RawMutex, const N: usize> Default for PushQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> Transport for PushQueue<M, N> {
    type Error = Error;

    fn push(&self, link: ConnHandle, handle: u16, payload: Payload<'_>, mode: AckMode) -> Result<(), Error> {
        let value = Vec::from_slice(payload).map_err(|_| Error::PayloadTooLarge)?;
        let request = PushRequest {
            link,
            handle,
            mode,
            value,
        };

        self.indication_pending.lock(|pending| {
            if mode == AckMode::Indication && pending.get() {
                return Err(Error::IndicationPending);
            }
            self.channel.try_send(request).map_err(|_| Error::QueueFull)?;
            if mode == AckMode::Indication {
                pending.set(true);
            }
            Ok(())
        })
    }
}
