//! Boundary to the stack that pushes attribute values to the peer.
use bt_hci::param::ConnHandle;

/// Largest value a single push can carry (default ATT MTU minus the 3-byte
/// handle-value header).
pub const MAX_PAYLOAD: usize = 20;

/// Raw value of a push.
pub type Payload<'p> = &'p [u8];

/// How the peer acknowledges a pushed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckMode {
    /// Fire-and-forget, no confirmation from the peer.
    Notification,
    /// The peer confirms receipt. The stack accepts at most one
    /// unconfirmed indication per link.
    Indication,
}

/// Pushes characteristic values to a connected peer.
///
/// `push` is called from the tick context. It must either hand the value to
/// the stack right away or fail right away; it never waits.
pub trait Transport {
    /// Failure reported by the stack (no buffer, link busy, bad handle...).
    type Error;

    /// Push `payload` as the new value of the attribute `handle` on `link`.
    fn push(&self, link: ConnHandle, handle: u16, payload: Payload<'_>, mode: AckMode) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn push(&self, link: ConnHandle, handle: u16, payload: Payload<'_>, mode: AckMode) -> Result<(), Self::Error> {
        T::push(self, link, handle, payload, mode)
    }
}
