//! Compile-time configuration.
//!
//! The settings below are fixed when the crate is built. Override them with
//! environment variables named `ESTC_BLE_<NAME>`, for example
//! `ESTC_BLE_MAX_SUBSCRIBERS=4 cargo build`, or in the `[env]` section of
//! `.cargo/config.toml`.
//!
//! The capacity-like settings only size the `Default*` type aliases; every
//! container in the crate also takes its size as a const generic.

mod raw {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

/// Period of the uptime clock in milliseconds.
///
/// Default: 1000.
pub const TICK_PERIOD_MS: u64 = raw::TICK_PERIOD_MS as u64;

/// Number of subscribers the default clock accepts.
///
/// Both delivery consumers subscribe at boot, so the build rejects values
/// below 2.
///
/// Default: 2.
pub const MAX_SUBSCRIBERS: usize = raw::MAX_SUBSCRIBERS;

/// Depth of the default push queue.
///
/// Default: 4.
pub const PUSH_QUEUE_SIZE: usize = raw::PUSH_QUEUE_SIZE;
