//! Fixed-capacity table of tick subscribers.
use heapless::Vec;

use crate::uptime::Uptime;
use crate::Error;

/// Receives every tick of the clock it is subscribed to.
///
/// Handlers run on the timer's delivery context and must return without
/// blocking.
pub trait TickHandler {
    /// Called once per tick with the new uptime.
    fn on_tick(&self, uptime: Uptime);
}

impl<F> TickHandler for F
where
    F: Fn(Uptime),
{
    fn on_tick(&self, uptime: Uptime) {
        self(uptime)
    }
}

/// Append-only registry of at most `N` tick handlers.
///
/// The handler reference doubles as the subscription context: whatever
/// state the handler needs is borrowed for `'a`, which outlives the registry.
pub struct Registry<'a, const N: usize> {
    slots: Vec<&'a dyn TickHandler, N>,
}

impl<'a, const N: usize> Registry<'a, N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Append a handler and return the slot it occupies.
    ///
    /// Slots are handed out in registration order. Once all `N` are taken
    /// this returns [`Error::RegistryFull`] and leaves the existing
    /// subscriptions untouched.
    pub fn register(&mut self, handler: &'a dyn TickHandler) -> Result<usize, Error> {
        let slot = self.slots.len();
        self.slots.push(handler).map_err(|_| Error::RegistryFull)?;
        Ok(slot)
    }

    /// Invoke every handler, in registration order.
    pub fn dispatch(&self, uptime: Uptime) {
        for handler in self.slots.iter() {
            handler.on_tick(uptime);
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<'a, const N: usize> Default for Registry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}
