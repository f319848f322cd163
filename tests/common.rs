#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embassy_time::Duration;
use estc_ble::prelude::*;

/// Failure returned by [`RecordingTransport`] when scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailure {
    NoBuffers,
    IndicationPending,
}

/// One call made to [`RecordingTransport::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub link: ConnHandle,
    pub handle: u16,
    pub value: Vec<u8>,
    pub mode: AckMode,
    pub accepted: bool,
}

impl Push {
    pub fn uptime(&self) -> Uptime {
        Uptime::from_le_bytes(&self.value).expect("uptime payload")
    }
}

/// Transport recording every push, optionally failing scripted calls.
#[derive(Default)]
pub struct RecordingTransport {
    calls: RefCell<Vec<Push>>,
    script: RefCell<VecDeque<Option<PushFailure>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome of the next push calls, in order. `None` accepts the push.
    pub fn script(&self, outcomes: &[Option<PushFailure>]) {
        self.script.borrow_mut().extend(outcomes.iter().copied());
    }

    pub fn calls(&self) -> Vec<Push> {
        self.calls.borrow().clone()
    }

    pub fn accepted(&self) -> Vec<Push> {
        self.calls.borrow().iter().filter(|p| p.accepted).cloned().collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Transport for RecordingTransport {
    type Error = PushFailure;

    fn push(&self, link: ConnHandle, handle: u16, payload: &[u8], mode: AckMode) -> Result<(), PushFailure> {
        let outcome = self.script.borrow_mut().pop_front().flatten();
        self.calls.borrow_mut().push(Push {
            link,
            handle,
            value: payload.to_vec(),
            mode,
            accepted: outcome.is_none(),
        });
        match outcome {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Error of [`MemoryTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

/// Characteristic as recorded by [`MemoryTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub service: u16,
    pub namespace: UuidNamespace,
    pub uuid: u16,
    pub props: CharacteristicProps,
    pub user_description: String,
    pub max_len: usize,
    pub handles: CharacteristicHandles,
}

/// In-memory attribute table, allocating handles the way a GATT server
/// lays them out: declaration, value, user description, then CCCD.
pub struct MemoryTable {
    next_handle: u16,
    capacity: usize,
    pub bases: Vec<BaseUuid>,
    pub services: Vec<(UuidNamespace, u16, u16)>,
    pub entries: Vec<TableEntry>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// A table that refuses characteristics beyond `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_handle: 0x000C,
            capacity,
            bases: Vec::new(),
            services: Vec::new(),
            entries: Vec::new(),
        }
    }

    fn alloc(&mut self) -> u16 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    pub fn entry(&self, uuid: u16) -> &TableEntry {
        self.entries.iter().find(|e| e.uuid == uuid).expect("characteristic present")
    }
}

impl GattTableBuilder for MemoryTable {
    type Error = TableFull;

    fn register_namespace(&mut self, base: &BaseUuid) -> Result<UuidNamespace, TableFull> {
        self.bases.push(*base);
        // Type 1 is reserved for Bluetooth SIG UUIDs.
        Ok(UuidNamespace(1 + self.bases.len() as u8))
    }

    fn add_service(&mut self, namespace: UuidNamespace, uuid: u16) -> Result<u16, TableFull> {
        let handle = self.alloc();
        self.services.push((namespace, uuid, handle));
        Ok(handle)
    }

    fn add_characteristic(
        &mut self,
        service: u16,
        namespace: UuidNamespace,
        spec: &CharacteristicSpec<'_>,
    ) -> Result<CharacteristicHandles, TableFull> {
        if self.entries.len() >= self.capacity {
            return Err(TableFull);
        }
        let _declaration = self.alloc();
        let value_handle = self.alloc();
        let user_desc_handle = Some(self.alloc());
        let cccd_handle = if spec.has_cccd() { Some(self.alloc()) } else { None };
        let handles = CharacteristicHandles {
            value_handle,
            user_desc_handle,
            cccd_handle,
        };
        self.entries.push(TableEntry {
            service,
            namespace,
            uuid: spec.uuid,
            props: spec.props,
            user_description: spec.user_description.to_string(),
            max_len: spec.max_len,
            handles,
        });
        Ok(handles)
    }
}

/// Error of [`ManualTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerUnavailable;

/// Timer source whose ticks are raised by the test itself.
#[derive(Default)]
pub struct ManualTimer {
    pub period: Cell<Option<Duration>>,
    pub broken: bool,
}

impl ManualTimer {
    pub fn broken() -> Self {
        Self {
            period: Cell::new(None),
            broken: true,
        }
    }
}

impl TimerSource for ManualTimer {
    type Error = TimerUnavailable;

    fn start_periodic(&mut self, period: Duration) -> Result<(), TimerUnavailable> {
        if self.broken {
            return Err(TimerUnavailable);
        }
        self.period.set(Some(period));
        Ok(())
    }
}

pub fn link() -> ConnHandle {
    ConnHandle::new(0)
}
pub const NOTIFY_HANDLE: u16 = 0x0010;
pub const INDICATE_HANDLE: u16 = 0x0014;
