#![no_std]

pub(crate) mod fmt;

pub mod ble_uptime_peripheral;
