//! GATT table description and the builder boundary.
//!
//! The attribute table itself is owned by the BLE stack. The service core
//! only describes what it needs and keeps the handles the builder returns.

/// A 16-bit or 128-bit UUID, bytes in little-endian order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    /// 16-bit UUID
    Uuid16([u8; 2]),
    /// 128-bit UUID
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Create a 128-bit UUID.
    pub const fn new_long(val: [u8; 16]) -> Self {
        Self::Uuid128(val)
    }

    /// Little-endian bytes of the UUID.
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Uuid::Uuid16(uuid) => uuid,
            Uuid::Uuid128(uuid) => uuid,
        }
    }
}

/// Vendor-specific base UUID.
///
/// Short UUIDs in the namespace replace bytes 12 and 13 of the base, the
/// `xxxx` in `8A15xxxx-73A5-4ECB-8BD1-698D4EEDD629`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaseUuid([u8; 16]);

impl BaseUuid {
    /// Create a base from its little-endian bytes.
    pub const fn new(le_bytes: [u8; 16]) -> Self {
        Self(le_bytes)
    }

    /// Little-endian bytes of the base.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Full UUID of `short` in this namespace.
    pub const fn expand(&self, short: u16) -> Uuid {
        let mut bytes = self.0;
        let [lo, hi] = short.to_le_bytes();
        bytes[12] = lo;
        bytes[13] = hi;
        Uuid::Uuid128(bytes)
    }
}

/// Token for a base UUID registered with the stack.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UuidNamespace(pub u8);

/// Characteristic properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CharacteristicProp {
    /// Broadcast
    Broadcast = 0x01,
    /// Read
    Read = 0x02,
    /// Write without response
    WriteWithoutResponse = 0x04,
    /// Write
    Write = 0x08,
    /// Notify
    Notify = 0x10,
    /// Indicate
    Indicate = 0x20,
    /// Authenticated writes
    AuthenticatedWrite = 0x40,
    /// Extended properties
    Extended = 0x80,
}

/// Set of [`CharacteristicProp`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicProps(u8);

impl CharacteristicProps {
    /// Build a set from a list of properties.
    pub const fn new(props: &[CharacteristicProp]) -> Self {
        let mut val = 0;
        let mut i = 0;
        while i < props.len() {
            val |= props[i] as u8;
            i += 1;
        }
        Self(val)
    }

    /// Whether any of `props` is set.
    pub fn any(&self, props: &[CharacteristicProp]) -> bool {
        props.iter().any(|p| self.0 & (*p as u8) != 0)
    }

    /// Whether `prop` is set.
    pub fn contains(&self, prop: CharacteristicProp) -> bool {
        self.0 & (prop as u8) != 0
    }

    /// Raw property bits, as in the characteristic declaration.
    pub const fn raw(&self) -> u8 {
        self.0
    }
}

impl<const T: usize> From<&[CharacteristicProp; T]> for CharacteristicProps {
    fn from(props: &[CharacteristicProp; T]) -> Self {
        Self::new(&props[..])
    }
}

impl From<&[CharacteristicProp]> for CharacteristicProps {
    fn from(props: &[CharacteristicProp]) -> Self {
        Self::new(props)
    }
}

/// Access requirement on an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityMode {
    /// Not accessible.
    NoAccess,
    /// No encryption required.
    Open,
    /// Encrypted link, no MITM protection.
    JustWorks,
    /// Encrypted link with MITM protection.
    Mitm,
}

/// Everything the builder needs to create one characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicSpec<'d> {
    /// Short UUID inside the service namespace.
    pub uuid: u16,
    /// Declared properties.
    pub props: CharacteristicProps,
    /// Characteristic user description.
    pub user_description: &'d str,
    /// Initial length of the value.
    pub init_len: usize,
    /// Maximum length of the value.
    pub max_len: usize,
    /// Read permission of the value.
    pub read: SecurityMode,
    /// Write permission of the value.
    pub write: SecurityMode,
    /// Permission to read and write the CCCD, present when the
    /// characteristic notifies or indicates.
    pub cccd: SecurityMode,
}

impl<'d> CharacteristicSpec<'d> {
    /// Whether the characteristic needs a CCCD.
    pub fn has_cccd(&self) -> bool {
        self.props.any(&[CharacteristicProp::Notify, CharacteristicProp::Indicate])
    }
}

/// Handles assigned to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicHandles {
    /// Handle of the value attribute, the target of pushes.
    pub value_handle: u16,
    /// Handle of the user description descriptor.
    pub user_desc_handle: Option<u16>,
    /// Handle of the CCCD.
    pub cccd_handle: Option<u16>,
}

/// Creates services and characteristics in the stack's attribute table.
///
/// Only used during initialization, before the clock is armed.
pub trait GattTableBuilder {
    /// Error reported by the stack.
    type Error;

    /// Register a vendor-specific base UUID.
    fn register_namespace(&mut self, base: &BaseUuid) -> Result<UuidNamespace, Self::Error>;

    /// Add a primary service and return its handle.
    fn add_service(&mut self, namespace: UuidNamespace, uuid: u16) -> Result<u16, Self::Error>;

    /// Add a characteristic to `service`.
    fn add_characteristic(
        &mut self,
        service: u16,
        namespace: UuidNamespace,
        spec: &CharacteristicSpec<'_>,
    ) -> Result<CharacteristicHandles, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_uuid_fills_base_placeholder() {
        let base = BaseUuid::new([
            0x29, 0xD6, 0xED, 0x4E, 0x8D, 0x69, 0xD1, 0x8B, 0xCB, 0x4E, 0xA5, 0x73, 0x00, 0x00, 0x15, 0x8A,
        ]);
        assert_eq!(
            base.expand(0xB3AA),
            Uuid::Uuid128([0x29, 0xD6, 0xED, 0x4E, 0x8D, 0x69, 0xD1, 0x8B, 0xCB, 0x4E, 0xA5, 0x73, 0xAA, 0xB3, 0x15, 0x8A])
        );
    }

    #[test]
    fn cccd_only_for_pushed_values() {
        let props = CharacteristicProps::new(&[CharacteristicProp::Read, CharacteristicProp::Write]);
        assert!(!props.any(&[CharacteristicProp::Notify, CharacteristicProp::Indicate]));

        let props: CharacteristicProps = (&[CharacteristicProp::Read, CharacteristicProp::Indicate]).into();
        assert!(props.contains(CharacteristicProp::Indicate));
        assert_eq!(props.raw(), 0x22);
    }
}
