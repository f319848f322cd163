//! Seconds counted by the uptime clock.

/// Seconds elapsed since the clock was started.
///
/// Only the [`Clock`](crate::clock::Clock) advances it; subscribers receive a
/// copy on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uptime(u64);

impl Uptime {
    /// Size of the value as pushed to a peer.
    pub const SIZE: usize = core::mem::size_of::<u64>();

    /// Uptime before the first tick.
    pub const ZERO: Uptime = Uptime(0);

    /// Create an uptime of `seconds`.
    pub const fn from_secs(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Number of whole seconds.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whether the count is even.
    pub const fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }

    /// The uptime one second later.
    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Little-endian representation, as the value is stored in the attribute.
    pub const fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        self.0.to_le_bytes()
    }

    /// Decode a value previously produced by [`Uptime::to_le_bytes`].
    pub fn from_le_bytes(data: &[u8]) -> Option<Self> {
        let bytes: [u8; Self::SIZE] = data.try_into().ok()?;
        Some(Self(u64::from_le_bytes(bytes)))
    }
}

impl From<u64> for Uptime {
    fn from(seconds: u64) -> Self {
        Self(seconds)
    }
}

impl From<Uptime> for u64 {
    fn from(uptime: Uptime) -> Self {
        uptime.0
    }
}

impl core::fmt::Display for Uptime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}s", self.0)
    }
}
