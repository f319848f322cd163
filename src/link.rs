//! Connection state shared between the link-event handler and the consumers.
//!
//! There is exactly one [`LinkWriter`], owned by whoever handles link
//! events. Consumers only ever get a [`LinkReader`].
use core::cell::Cell;

use bt_hci::param::ConnHandle;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::Error;

/// Current link to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Link {
    /// No peer is connected.
    Disconnected,
    /// A peer is connected over this link.
    Connected(ConnHandle),
}

impl Link {
    /// Handle of the connected link, if any.
    pub fn handle(&self) -> Option<ConnHandle> {
        match self {
            Link::Connected(handle) => Some(*handle),
            Link::Disconnected => None,
        }
    }
}

/// Link events delivered by the BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A link was established.
    Connected(ConnHandle),
    /// A link was lost.
    Disconnected(ConnHandle),
}

#[derive(Clone, Copy)]
struct State {
    link: Link,
    writer_taken: bool,
}

/// Storage for the current [`Link`].
pub struct LinkState<M: RawMutex> {
    state: Mutex<M, Cell<State>>,
}

impl<M: RawMutex> LinkState<M> {
    /// Create a state with no peer connected.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(State {
                link: Link::Disconnected,
                writer_taken: false,
            })),
        }
    }

    /// Take the only writer for this state.
    ///
    /// Fails with [`Error::WriterTaken`] on every call after the first.
    pub fn take_writer(&self) -> Result<LinkWriter<'_, M>, Error> {
        self.state.lock(|state| {
            let mut s = state.get();
            if s.writer_taken {
                return Err(Error::WriterTaken);
            }
            s.writer_taken = true;
            state.set(s);
            Ok(LinkWriter { state: self })
        })
    }

    /// Get a read-only view.
    pub fn reader(&self) -> LinkReader<'_, M> {
        LinkReader { state: self }
    }

    fn get(&self) -> Link {
        self.state.lock(|state| state.get().link)
    }

    fn set(&self, link: Link) {
        self.state.lock(|state| {
            let mut s = state.get();
            s.link = link;
            state.set(s);
        })
    }
}

impl<M: RawMutex> Default for LinkState<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a [`LinkState`].
pub struct LinkReader<'a, M: RawMutex> {
    state: &'a LinkState<M>,
}

impl<'a, M: RawMutex> Clone for LinkReader<'a, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M: RawMutex> Copy for LinkReader<'a, M> {}

impl<'a, M: RawMutex> LinkReader<'a, M> {
    /// Current link.
    pub fn get(&self) -> Link {
        self.state.get()
    }

    /// Handle of the connected link, if any.
    pub fn handle(&self) -> Option<ConnHandle> {
        self.get().handle()
    }

    /// Whether a peer is connected.
    pub fn is_connected(&self) -> bool {
        self.handle().is_some()
    }
}

/// The single writer of a [`LinkState`].
pub struct LinkWriter<'a, M: RawMutex> {
    state: &'a LinkState<M>,
}

impl<'a, M: RawMutex> LinkWriter<'a, M> {
    /// Apply a link event.
    pub fn apply(&mut self, event: LinkEvent) -> Result<(), Error> {
        match event {
            LinkEvent::Connected(handle) => self.connected(handle),
            LinkEvent::Disconnected(handle) => self.disconnected(handle),
        }
    }

    /// Record a newly established link.
    ///
    /// The peripheral serves a single link. A second link-established event
    /// while connected is refused with [`Error::AlreadyConnected`] carrying
    /// the link that stays current.
    pub fn connected(&mut self, handle: ConnHandle) -> Result<(), Error> {
        match self.state.get() {
            Link::Connected(current) => {
                warn!(
                    "[link] connect on {} while {} is up, ignored",
                    handle.raw(),
                    current.raw()
                );
                Err(Error::AlreadyConnected(current))
            }
            Link::Disconnected => {
                self.state.set(Link::Connected(handle));
                info!("[link] connected, handle {}", handle.raw());
                Ok(())
            }
        }
    }

    /// Record the loss of a link.
    ///
    /// Returns [`Error::NotFound`] if `handle` is not the current link.
    pub fn disconnected(&mut self, handle: ConnHandle) -> Result<(), Error> {
        match self.state.get() {
            Link::Connected(current) if current == handle => {
                self.state.set(Link::Disconnected);
                info!("[link] disconnected, handle {}", handle.raw());
                Ok(())
            }
            _ => {
                trace!("[link] disconnect for unknown handle {}", handle.raw());
                Err(Error::NotFound)
            }
        }
    }

    /// Current link.
    pub fn get(&self) -> Link {
        self.state.get()
    }

    /// Get a read-only view of the same state.
    pub fn reader(&self) -> LinkReader<'a, M> {
        self.state.reader()
    }
}
