//! Tick-driven value delivery for the ESTC BLE peripheral service.
//!
//! A one-second [`Clock`](clock::Clock) fans every tick out to a bounded set
//! of subscribers. Two [`DeliveryConsumer`](consumer::DeliveryConsumer)s sit
//! on that clock: one pushes the uptime as an indication on even ticks, the
//! other as a notification on odd ticks, and both stay silent while no peer
//! is connected.
//!
//! The GATT table builder, the radio stack and the timer hardware are reached
//! through the traits in [`gatt`], [`transport`] and [`clock`].
#![no_std]

use bt_hci::param::ConnHandle;

mod fmt;

pub mod clock;
pub mod config;
pub mod consumer;
pub mod gatt;
pub mod link;
pub mod queue;
pub mod registry;
pub mod service;
pub mod transport;
pub mod uptime;

/// Commonly used types.
pub mod prelude {
    pub use bt_hci::param::ConnHandle;

    pub use crate::clock::{Clock, DefaultClock, TimerSource};
    pub use crate::consumer::{DeliveryConsumer, DeliveryStats, Parity};
    pub use crate::gatt::{
        BaseUuid, CharacteristicHandles, CharacteristicProp, CharacteristicProps, CharacteristicSpec, GattTableBuilder,
        SecurityMode, Uuid, UuidNamespace,
    };
    pub use crate::link::{Link, LinkEvent, LinkReader, LinkState, LinkWriter};
    pub use crate::queue::{DefaultPushQueue, PushQueue, PushRequest};
    pub use crate::registry::{Registry, TickHandler};
    pub use crate::service::EstcService;
    pub use crate::transport::{AckMode, Payload, Transport};
    pub use crate::uptime::Uptime;
    pub use crate::{BleStackError, Error};
}

/// Errors raised by the service core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every subscription slot of the clock is taken.
    RegistryFull,
    /// A link-established event arrived while this link is still up.
    AlreadyConnected(ConnHandle),
    /// The referenced link is not the current one.
    NotFound,
    /// The link state writer was already handed out.
    WriterTaken,
    /// The push queue has no free slot.
    QueueFull,
    /// An indication is still waiting for the peer's confirmation.
    IndicationPending,
    /// The value does not fit a push request.
    PayloadTooLarge,
    /// A timer tick arrived while the previous one was still being dispatched.
    Reentrant,
}

/// Errors from boot-time wiring against an external stack.
#[derive(Debug)]
pub enum BleStackError<E> {
    /// Error reported by the GATT table builder, timer or radio stack.
    Stack(E),
    /// Error raised by the service core.
    Service(Error),
}

impl<E> From<Error> for BleStackError<E> {
    fn from(e: Error) -> Self {
        Self::Service(e)
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for BleStackError<E>
where
    E: defmt::Format,
{
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            BleStackError::Stack(e) => defmt::write!(fmt, "Stack({})", e),
            BleStackError::Service(e) => defmt::write!(fmt, "Service({})", e),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::RegistryFull => f.write_str("subscriber registry is full"),
            Error::AlreadyConnected(handle) => write!(f, "link {} is already connected", handle.raw()),
            Error::NotFound => f.write_str("link not found"),
            Error::WriterTaken => f.write_str("link state writer already taken"),
            Error::QueueFull => f.write_str("push queue is full"),
            Error::IndicationPending => f.write_str("indication awaiting confirmation"),
            Error::PayloadTooLarge => f.write_str("payload too large"),
            Error::Reentrant => f.write_str("tick raised during dispatch"),
        }
    }
}
