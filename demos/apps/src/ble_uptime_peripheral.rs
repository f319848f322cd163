use embassy_futures::join::join3;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use estc_ble::clock::{Clock, DefaultClock};
use estc_ble::gatt::{CharacteristicHandles, CharacteristicSpec, GattTableBuilder, UuidNamespace};
use estc_ble::link::{LinkEvent, LinkState};
use estc_ble::queue::{DefaultPushQueue, PushQueue};
use estc_ble::service::{self as estc, EstcService};
use estc_ble::transport::AckMode;
use trouble_host::prelude::*;

/// Max number of connections
const CONNECTIONS_MAX: usize = 1;

/// Max number of L2CAP channels.
const L2CAP_CHANNELS_MAX: usize = 2; // Signal + att

// GATT Server definition
#[gatt_server]
struct Server {
    estc_service: EstcGattService,
}

/// ESTC service, UUIDs in the `8A15xxxx-73A5-4ECB-8BD1-698D4EEDD629` namespace.
#[gatt_service(uuid = "8a15b3aa-73a5-4ecb-8bd1-698d4eedd629")]
struct EstcGattService {
    #[descriptor(uuid = "2901", read, value = "ESTC Read/Write")]
    #[characteristic(uuid = "8a151200-73a5-4ecb-8bd1-698d4eedd629", read, write)]
    rdwr: [u8; 2],
    #[descriptor(uuid = "2901", read, value = "ESTC Notify")]
    #[characteristic(uuid = "8a151201-73a5-4ecb-8bd1-698d4eedd629", read, notify)]
    notify: [u8; 8],
    #[descriptor(uuid = "2901", read, value = "ESTC Indicate")]
    #[characteristic(uuid = "8a151202-73a5-4ecb-8bd1-698d4eedd629", read, indicate)]
    indicate: [u8; 8],
}

/// The characteristic is not declared by [`Server`].
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Undeclared(u16);

/// Binds the service descriptor to the attributes the `gatt_server` macro
/// already laid out, checking that every requested UUID is declared.
struct Binder<'s, 'v> {
    server: &'s Server<'v>,
}

impl GattTableBuilder for Binder<'_, '_> {
    type Error = Undeclared;

    fn register_namespace(&mut self, _base: &estc_ble::gatt::BaseUuid) -> Result<UuidNamespace, Undeclared> {
        Ok(UuidNamespace(2))
    }

    fn add_service(&mut self, _namespace: UuidNamespace, uuid: u16) -> Result<u16, Undeclared> {
        if uuid != estc::SERVICE_UUID {
            return Err(Undeclared(uuid));
        }
        Ok(self.server.estc_service.handle_range().start)
    }

    fn add_characteristic(
        &mut self,
        _service: u16,
        _namespace: UuidNamespace,
        spec: &CharacteristicSpec<'_>,
    ) -> Result<CharacteristicHandles, Undeclared> {
        let svc = &self.server.estc_service;
        let value_handle = match spec.uuid {
            estc::RDWR_CHAR_UUID => svc.rdwr.handle,
            estc::NOTIFY_CHAR_UUID => svc.notify.handle,
            estc::INDICATE_CHAR_UUID => svc.indicate.handle,
            other => return Err(Undeclared(other)),
        };
        // Descriptor handles stay with the stack.
        Ok(CharacteristicHandles {
            value_handle,
            user_desc_handle: None,
            cccd_handle: None,
        })
    }
}

/// Run the BLE stack.
pub async fn run<C>(controller: C)
where
    C: Controller,
{
    let address: Address = Address::random([0xff, 0x8f, 0x1a, 0x05, 0xe4, 0xff]);
    info!("Our address = {:?}", address);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> = HostResources::new();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(address);
    let Host {
        mut peripheral, runner, ..
    } = stack.build();

    let server = Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: "ESTC",
        appearance: &appearance::UNKNOWN,
    }))
    .unwrap();

    let link: LinkState<NoopRawMutex> = LinkState::new();
    let queue: DefaultPushQueue<NoopRawMutex> = PushQueue::new();
    let mut service = match EstcService::init(&mut Binder { server: &server }, &link) {
        Ok(service) => service,
        Err(e) => panic!("[estc] service init failed: {:?}", e),
    };

    let indicate = service.indicate_consumer(&queue);
    let notify = service.notify_consumer(&queue);
    let mut clock: DefaultClock<'_, NoopRawMutex> = Clock::new();
    clock.subscribe(&indicate).unwrap();
    clock.subscribe(&notify).unwrap();

    info!("Starting advertising and GATT service");
    let _ = join3(ble_task(runner), clock.run(), async {
        loop {
            match advertise("ESTC", &mut peripheral, &server).await {
                Ok(conn) => {
                    let handle = estc_ble::prelude::ConnHandle::new(conn.raw().handle().raw());
                    if let Err(e) = service.on_link_event(LinkEvent::Connected(handle)) {
                        warn!("[estc] {:?}", e);
                    }
                    select(gatt_events_task(&server, &conn), push_task(&server, &conn, &queue)).await;
                    if let Err(e) = service.on_link_event(LinkEvent::Disconnected(handle)) {
                        warn!("[estc] {:?}", e);
                    }
                    queue.clear();
                }
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    let e = defmt::Debug2Format(&e);
                    panic!("[adv] error: {:?}", e);
                }
            }
        }
    })
    .await;
}

async fn ble_task<C: Controller, P: PacketPool>(mut runner: Runner<'_, C, P>) {
    loop {
        if let Err(e) = runner.run().await {
            #[cfg(feature = "defmt")]
            let e = defmt::Debug2Format(&e);
            panic!("[ble_task] error: {:?}", e);
        }
    }
}

/// Answer GATT requests until the peer disconnects.
async fn gatt_events_task<P: PacketPool>(server: &Server<'_>, conn: &GattConnection<'_, '_, P>) {
    let rdwr = server.estc_service.rdwr;
    let reason = loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => break reason,
            GattConnectionEvent::Gatt { event } => {
                if let GattEvent::Write(write) = &event {
                    if write.handle() == rdwr.handle {
                        info!("[gatt] read/write value set to {:?}", write.data());
                    }
                }
                match event.accept() {
                    Ok(reply) => reply.send().await,
                    Err(e) => warn!("[gatt] error sending response: {:?}", e),
                }
            }
            _ => {}
        }
    };
    info!("[gatt] disconnected: {:?}", reason);
}

/// Send what the tick consumers queued.
///
/// An indication is awaited until the peer confirms it; the queue refuses
/// new indications meanwhile.
async fn push_task<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    queue: &DefaultPushQueue<NoopRawMutex>,
) {
    let notify = server.estc_service.notify;
    let indicate = server.estc_service.indicate;
    loop {
        let request = queue.receive().await;
        let Ok(value) = <[u8; 8]>::try_from(request.value.as_slice()) else {
            warn!("[push] unexpected value length {}", request.value.len());
            if request.mode == AckMode::Indication {
                queue.indication_failed();
            }
            continue;
        };
        if request.handle == notify.handle {
            if notify.notify(conn, &value).await.is_err() {
                info!("[push] connection closed");
                break;
            }
        } else if request.handle == indicate.handle {
            match indicate.indicate(conn, &value).await {
                Ok(()) => queue.indication_confirmed(),
                Err(e) => {
                    queue.indication_failed();
                    info!("[push] indication failed: {:?}", e);
                    break;
                }
            }
        }
    }
}

/// 128-bit service UUID for the scan response.
fn service_uuid() -> [u8; 16] {
    let mut uuid = [0; 16];
    uuid.copy_from_slice(estc::BASE_UUID.expand(estc::SERVICE_UUID).as_raw());
    uuid
}

async fn advertise<'values, 'server, C: Controller>(
    name: &'values str,
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server Server<'values>,
) -> Result<GattConnection<'values, 'server, DefaultPacketPool>, BleHostError<C::Error>> {
    let mut advertiser_data = [0; 31];
    let len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::CompleteLocalName(name.as_bytes()),
        ],
        &mut advertiser_data[..],
    )?;
    let mut scan_data = [0; 31];
    let scan_len = AdStructure::encode_slice(
        &[AdStructure::ServiceUuids128(&[service_uuid()])],
        &mut scan_data[..],
    )?;
    let advertiser = peripheral
        .advertise(
            &Default::default(),
            Advertisement::ConnectableScannableUndirected {
                adv_data: &advertiser_data[..len],
                scan_data: &scan_data[..scan_len],
            },
        )
        .await?;
    info!("[adv] advertising");
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    info!("[adv] connection established");
    Ok(conn)
}
