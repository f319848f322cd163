//! The ESTC GATT service.
//!
//! Three characteristics live in the vendor namespace
//! `8A15xxxx-73A5-4ECB-8BD1-698D4EEDD629`:
//!
//! - read/write (`0x1200`): a 2-byte scratch value,
//! - notify (`0x1201`): the uptime, pushed on odd seconds,
//! - indicate (`0x1202`): the uptime, pushed on even seconds.
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::consumer::DeliveryConsumer;
use crate::gatt::{
    BaseUuid, CharacteristicHandles, CharacteristicProp, CharacteristicProps, CharacteristicSpec, GattTableBuilder,
    SecurityMode, UuidNamespace,
};
use crate::link::{Link, LinkEvent, LinkReader, LinkState, LinkWriter};
use crate::transport::Transport;
use crate::uptime::Uptime;
use crate::{BleStackError, Error};

/// Base UUID of the service namespace, little-endian.
pub const BASE_UUID: BaseUuid = BaseUuid::new([
    0x29, 0xD6, 0xED, 0x4E, 0x8D, 0x69, // -
    0xD1, 0x8B, // -
    0xCB, 0x4E, // -
    0xA5, 0x73, // -
    0x00, 0x00, 0x15, 0x8A,
]);

/// Short UUID of the service.
pub const SERVICE_UUID: u16 = 0xB3AA;

/// Short UUID of the read/write characteristic.
pub const RDWR_CHAR_UUID: u16 = 0x1200;
/// Short UUID of the notify characteristic.
pub const NOTIFY_CHAR_UUID: u16 = 0x1201;
/// Short UUID of the indicate characteristic.
pub const INDICATE_CHAR_UUID: u16 = 0x1202;

/// Length of the read/write value.
pub const RDWR_VALUE_LEN: usize = 2;

/// Read/write characteristic.
pub const RDWR_CHAR: CharacteristicSpec<'static> = CharacteristicSpec {
    uuid: RDWR_CHAR_UUID,
    props: CharacteristicProps::new(&[CharacteristicProp::Read, CharacteristicProp::Write]),
    user_description: "ESTC Read/Write",
    init_len: RDWR_VALUE_LEN,
    max_len: RDWR_VALUE_LEN,
    read: SecurityMode::Open,
    write: SecurityMode::Open,
    cccd: SecurityMode::NoAccess,
};

/// Notify characteristic.
pub const NOTIFY_CHAR: CharacteristicSpec<'static> = CharacteristicSpec {
    uuid: NOTIFY_CHAR_UUID,
    props: CharacteristicProps::new(&[CharacteristicProp::Notify]),
    user_description: "ESTC Notify",
    init_len: Uptime::SIZE,
    max_len: Uptime::SIZE,
    read: SecurityMode::Open,
    write: SecurityMode::NoAccess,
    cccd: SecurityMode::Open,
};

/// Indicate characteristic.
pub const INDICATE_CHAR: CharacteristicSpec<'static> = CharacteristicSpec {
    uuid: INDICATE_CHAR_UUID,
    props: CharacteristicProps::new(&[CharacteristicProp::Indicate]),
    user_description: "ESTC Indicate",
    init_len: Uptime::SIZE,
    max_len: Uptime::SIZE,
    read: SecurityMode::Open,
    write: SecurityMode::NoAccess,
    cccd: SecurityMode::Open,
};

/// Descriptor of the initialized service.
///
/// Created once at boot and kept for the lifetime of the firmware. It owns
/// the writer of the link state; the consumers it hands out only read it.
pub struct EstcService<'a, M: RawMutex> {
    namespace: UuidNamespace,
    service_handle: u16,
    rdwr: CharacteristicHandles,
    notify: CharacteristicHandles,
    indicate: CharacteristicHandles,
    link: LinkWriter<'a, M>,
}

impl<'a, M: RawMutex> EstcService<'a, M> {
    /// Create the service and its three characteristics.
    ///
    /// Takes the writer of `link`, so a link state can back only one service.
    pub fn init<B: GattTableBuilder>(builder: &mut B, link: &'a LinkState<M>) -> Result<Self, BleStackError<B::Error>> {
        let link = link.take_writer()?;

        let namespace = builder.register_namespace(&BASE_UUID).map_err(BleStackError::Stack)?;
        let service_handle = builder
            .add_service(namespace, SERVICE_UUID)
            .map_err(BleStackError::Stack)?;

        let mut add = |spec: &CharacteristicSpec<'_>| {
            let handles = builder
                .add_characteristic(service_handle, namespace, spec)
                .map_err(BleStackError::Stack)?;
            debug!(
                "[estc] added characteristic {:04x}, value handle {}",
                spec.uuid, handles.value_handle
            );
            Ok::<_, BleStackError<B::Error>>(handles)
        };

        let rdwr = add(&RDWR_CHAR)?;
        let notify = add(&NOTIFY_CHAR)?;
        let indicate = add(&INDICATE_CHAR)?;

        info!("[estc] service ready, handle {}", service_handle);
        Ok(Self {
            namespace,
            service_handle,
            rdwr,
            notify,
            indicate,
            link,
        })
    }

    /// Consumer pushing the uptime on the indicate characteristic.
    pub fn indicate_consumer<T: Transport>(&self, transport: &'a T) -> DeliveryConsumer<'a, M, T> {
        DeliveryConsumer::indicate(self.indicate.value_handle, self.link.reader(), transport)
    }

    /// Consumer pushing the uptime on the notify characteristic.
    pub fn notify_consumer<T: Transport>(&self, transport: &'a T) -> DeliveryConsumer<'a, M, T> {
        DeliveryConsumer::notify(self.notify.value_handle, self.link.reader(), transport)
    }

    /// Route a link event from the stack into the link state.
    pub fn on_link_event(&mut self, event: LinkEvent) -> Result<(), Error> {
        self.link.apply(event)
    }

    /// Current link.
    pub fn link(&self) -> Link {
        self.link.get()
    }

    /// Read-only view of the link state.
    pub fn link_reader(&self) -> LinkReader<'a, M> {
        self.link.reader()
    }

    /// Namespace token returned by the builder.
    pub fn namespace(&self) -> UuidNamespace {
        self.namespace
    }

    /// Handle of the service declaration.
    pub fn service_handle(&self) -> u16 {
        self.service_handle
    }

    /// Handles of the read/write characteristic.
    pub fn rdwr_handles(&self) -> CharacteristicHandles {
        self.rdwr
    }

    /// Handles of the notify characteristic.
    pub fn notify_handles(&self) -> CharacteristicHandles {
        self.notify
    }

    /// Handles of the indicate characteristic.
    pub fn indicate_handles(&self) -> CharacteristicHandles {
        self.indicate
    }
}
