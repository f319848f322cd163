//! Parity-gated delivery of the uptime to a connected peer.
use core::cell::Cell;
use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::link::LinkReader;
use crate::registry::TickHandler;
use crate::transport::{AckMode, Transport};
use crate::uptime::Uptime;

/// Which ticks a consumer acts on.
///
/// The indicate consumer takes even ticks and the notify consumer odd ones,
/// so exactly one characteristic changes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// Ticks divisible by two.
    Even,
    /// All other ticks.
    Odd,
}

impl Parity {
    /// Whether this policy lets `uptime` through.
    pub const fn admits(self, uptime: Uptime) -> bool {
        match self {
            Parity::Even => uptime.is_even(),
            Parity::Odd => !uptime.is_even(),
        }
    }
}

/// What a consumer did with one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// The parity policy rejected the tick.
    Skipped,
    /// No peer is connected.
    Idle,
    /// The transport accepted the value.
    Sent,
    /// The transport refused the value; it is not retried.
    Dropped,
}

/// Per-consumer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeliveryStats {
    /// Values accepted by the transport.
    pub delivered: u32,
    /// Values refused by the transport.
    pub dropped: u32,
    /// Ticks rejected by the parity policy.
    pub skipped: u32,
    /// Ticks with matching parity but no connected peer.
    pub idle: u32,
}

impl DeliveryStats {
    fn record(&mut self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Skipped => &mut self.skipped,
            Delivery::Idle => &mut self.idle,
            Delivery::Sent => &mut self.delivered,
            Delivery::Dropped => &mut self.dropped,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// Pushes the uptime to one characteristic when its parity comes up.
///
/// Nothing is buffered: a tick that finds no peer, or whose push fails, is
/// simply gone, and the next matching tick is handled on its own.
pub struct DeliveryConsumer<'a, M: RawMutex, T: Transport> {
    handle: u16,
    mode: AckMode,
    parity: Parity,
    link: LinkReader<'a, M>,
    transport: &'a T,
    stats: Mutex<M, Cell<DeliveryStats>>,
}

impl<'a, M: RawMutex, T: Transport> DeliveryConsumer<'a, M, T> {
    /// Create a consumer for the attribute `handle`.
    pub fn new(handle: u16, mode: AckMode, parity: Parity, link: LinkReader<'a, M>, transport: &'a T) -> Self {
        Self {
            handle,
            mode,
            parity,
            link,
            transport,
            stats: Mutex::new(Cell::new(DeliveryStats::default())),
        }
    }

    /// Consumer indicating the uptime on even ticks.
    pub fn indicate(handle: u16, link: LinkReader<'a, M>, transport: &'a T) -> Self {
        Self::new(handle, AckMode::Indication, Parity::Even, link, transport)
    }

    /// Consumer notifying the uptime on odd ticks.
    pub fn notify(handle: u16, link: LinkReader<'a, M>, transport: &'a T) -> Self {
        Self::new(handle, AckMode::Notification, Parity::Odd, link, transport)
    }

    /// Attribute value handle this consumer writes to.
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Acknowledgement mode of the pushes.
    pub fn mode(&self) -> AckMode {
        self.mode
    }

    /// Parity policy.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DeliveryStats {
        self.stats.lock(|stats| stats.get())
    }
}

impl<'a, M: RawMutex, T> DeliveryConsumer<'a, M, T>
where
    T: Transport,
    T::Error: Debug,
{
    /// Handle one tick.
    pub fn deliver(&self, uptime: Uptime) -> Delivery {
        let delivery = self.try_deliver(uptime);
        self.stats.lock(|stats| {
            let mut s = stats.get();
            s.record(delivery);
            stats.set(s);
        });
        delivery
    }

    fn try_deliver(&self, uptime: Uptime) -> Delivery {
        if !self.parity.admits(uptime) {
            return Delivery::Skipped;
        }

        let Some(link) = self.link.handle() else {
            trace!("[consumer {}] tick {}, no peer", self.handle, uptime.as_secs());
            return Delivery::Idle;
        };

        let payload = uptime.to_le_bytes();
        match self.transport.push(link, self.handle, &payload, self.mode) {
            Ok(()) => {
                debug!(
                    "[consumer {}] pushed tick {} as {:?}",
                    self.handle,
                    uptime.as_secs(),
                    self.mode
                );
                Delivery::Sent
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                let e = defmt::Debug2Format(&e);
                warn!(
                    "[consumer {}] dropped tick {}: {:?}",
                    self.handle,
                    uptime.as_secs(),
                    e
                );
                Delivery::Dropped
            }
        }
    }
}

impl<'a, M: RawMutex, T> TickHandler for DeliveryConsumer<'a, M, T>
where
    T: Transport,
    T::Error: Debug,
{
    fn on_tick(&self, uptime: Uptime) {
        let _ = self.deliver(uptime);
    }
}
