use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use estc_ble::prelude::*;
use estc_ble::queue::PushQueue;
use estc_ble::service::{BASE_UUID, INDICATE_CHAR_UUID, NOTIFY_CHAR_UUID, RDWR_CHAR_UUID, RDWR_VALUE_LEN, SERVICE_UUID};

mod common;

use common::{link, MemoryTable, TableFull};

#[test]
fn init_builds_the_attribute_table() {
    let _ = env_logger::try_init();
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let mut table = MemoryTable::new();
    let service = EstcService::init(&mut table, &state).unwrap();

    assert_eq!(table.bases, vec![BASE_UUID]);
    assert_eq!(table.services, vec![(service.namespace(), SERVICE_UUID, service.service_handle())]);
    assert_eq!(
        table.entries.iter().map(|e| e.uuid).collect::<Vec<_>>(),
        vec![RDWR_CHAR_UUID, NOTIFY_CHAR_UUID, INDICATE_CHAR_UUID]
    );

    let rdwr = table.entry(RDWR_CHAR_UUID);
    assert!(rdwr.props.contains(CharacteristicProp::Read));
    assert!(rdwr.props.contains(CharacteristicProp::Write));
    assert!(!rdwr.props.any(&[CharacteristicProp::Notify, CharacteristicProp::Indicate]));
    assert_eq!(rdwr.max_len, RDWR_VALUE_LEN);
    assert_eq!(rdwr.user_description, "ESTC Read/Write");
    assert_eq!(rdwr.handles.cccd_handle, None);

    let notify = table.entry(NOTIFY_CHAR_UUID);
    assert!(notify.props.contains(CharacteristicProp::Notify));
    assert_eq!(notify.max_len, Uptime::SIZE);
    assert_eq!(notify.user_description, "ESTC Notify");
    assert!(notify.handles.cccd_handle.is_some());

    let indicate = table.entry(INDICATE_CHAR_UUID);
    assert!(indicate.props.contains(CharacteristicProp::Indicate));
    assert_eq!(indicate.user_description, "ESTC Indicate");
    assert!(indicate.handles.cccd_handle.is_some());

    assert_eq!(service.rdwr_handles(), rdwr.handles);
    assert_eq!(service.notify_handles(), notify.handles);
    assert_eq!(service.indicate_handles(), indicate.handles);
    assert!(table.entries.iter().all(|e| e.namespace == service.namespace()));
}

#[test]
fn characteristic_uuids_expand_from_the_base() {
    let uuid = BASE_UUID.expand(SERVICE_UUID);
    let mut expected = *BASE_UUID.as_bytes();
    expected[12] = 0xAA;
    expected[13] = 0xB3;
    assert_eq!(uuid, Uuid::new_long(expected));
    assert_eq!(uuid.as_raw(), &expected[..]);
}

#[test]
fn consumers_target_their_value_handles() {
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let queue: PushQueue<NoopRawMutex, 4> = PushQueue::new();
    let mut table = MemoryTable::new();
    let service = EstcService::init(&mut table, &state).unwrap();

    let indicate = service.indicate_consumer(&queue);
    let notify = service.notify_consumer(&queue);
    assert_eq!(indicate.handle(), service.indicate_handles().value_handle);
    assert_eq!(indicate.mode(), AckMode::Indication);
    assert_eq!(indicate.parity(), Parity::Even);
    assert_eq!(notify.handle(), service.notify_handles().value_handle);
    assert_eq!(notify.mode(), AckMode::Notification);
    assert_eq!(notify.parity(), Parity::Odd);
}

#[test]
fn link_events_follow_the_connection() {
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let mut table = MemoryTable::new();
    let mut service = EstcService::init(&mut table, &state).unwrap();
    let reader = service.link_reader();

    assert_eq!(service.link(), Link::Disconnected);
    service.on_link_event(LinkEvent::Connected(link())).unwrap();
    assert_eq!(reader.get(), Link::Connected(link()));

    let other = ConnHandle::new(7);
    assert_eq!(
        service.on_link_event(LinkEvent::Connected(other)),
        Err(Error::AlreadyConnected(link()))
    );
    assert_eq!(service.on_link_event(LinkEvent::Disconnected(other)), Err(Error::NotFound));
    assert_eq!(reader.handle(), Some(link()));

    service.on_link_event(LinkEvent::Disconnected(link())).unwrap();
    assert!(!reader.is_connected());
    assert_eq!(service.on_link_event(LinkEvent::Disconnected(link())), Err(Error::NotFound));
}

#[test]
fn link_state_backs_a_single_service() {
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let mut table = MemoryTable::new();
    let _service = EstcService::init(&mut table, &state).unwrap();

    let mut again = MemoryTable::new();
    match EstcService::init(&mut again, &state) {
        Err(BleStackError::Service(Error::WriterTaken)) => {}
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("second service on the same link state"),
    }
    assert!(again.entries.is_empty());
}

#[test]
fn builder_failure_is_reported() {
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let mut table = MemoryTable::with_capacity(2);
    match EstcService::init(&mut table, &state) {
        Err(BleStackError::Stack(TableFull)) => {}
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("table should be full"),
    }
    assert_eq!(table.entries.len(), 2);
}

#[test]
fn ticks_reach_the_push_queue() {
    let _ = env_logger::try_init();
    let state: LinkState<NoopRawMutex> = LinkState::new();
    let queue: PushQueue<NoopRawMutex, 4> = PushQueue::new();
    let mut table = MemoryTable::new();
    let mut service = EstcService::init(&mut table, &state).unwrap();

    let indicate = service.indicate_consumer(&queue);
    let notify = service.notify_consumer(&queue);
    let mut clock: Clock<'_, NoopRawMutex, 2> = Clock::new();
    clock.subscribe(&indicate).unwrap();
    clock.subscribe(&notify).unwrap();

    // Tick 1, nobody connected.
    clock.on_timer_tick().unwrap();
    assert!(queue.try_receive().is_none());

    service.on_link_event(LinkEvent::Connected(link())).unwrap();
    clock.on_timer_tick().unwrap();
    clock.on_timer_tick().unwrap();

    let first = queue.try_receive().unwrap();
    assert_eq!(first.link, link());
    assert_eq!(first.handle, service.indicate_handles().value_handle);
    assert_eq!(first.mode, AckMode::Indication);
    assert_eq!(Uptime::from_le_bytes(&first.value), Some(Uptime::from_secs(2)));

    let second = queue.try_receive().unwrap();
    assert_eq!(second.handle, service.notify_handles().value_handle);
    assert_eq!(second.mode, AckMode::Notification);
    assert_eq!(Uptime::from_le_bytes(&second.value), Some(Uptime::from_secs(3)));
    assert!(queue.try_receive().is_none());

    // Tick 4 is dropped while tick 2 is still unconfirmed.
    clock.on_timer_tick().unwrap();
    assert!(queue.try_receive().is_none());
    assert_eq!(indicate.stats().dropped, 1);

    queue.indication_confirmed();
    clock.on_timer_tick().unwrap();
    clock.on_timer_tick().unwrap();
    let values: Vec<u64> = core::iter::from_fn(|| queue.try_receive())
        .map(|r| Uptime::from_le_bytes(&r.value).unwrap().as_secs())
        .collect();
    assert_eq!(values, vec![5, 6]);

    service.on_link_event(LinkEvent::Disconnected(link())).unwrap();
    queue.clear();
    clock.on_timer_tick().unwrap();
    clock.on_timer_tick().unwrap();
    assert!(queue.try_receive().is_none());
    assert_eq!(clock.uptime(), Uptime::from_secs(8));
}
