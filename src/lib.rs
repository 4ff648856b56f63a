//! Sensor cycle firmware for a vitals and environment node.
//!
//! Once per cycle the node samples a pulse oximeter, a GPS receiver, a digital
//! humidity pin and an analog temperature pin, formats a status line and sends
//! it over serial. In the relay variant the line is tagged with a device id and
//! forwarded to a peer before being echoed locally.
//!
//! Everything outside `hardware` and `display` is hardware-independent and is
//! unit tested on the host. The ESP32-S3 adapters are behind the `firmware`
//! feature.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod format;
pub mod framing;
pub mod logic;
pub mod mock;
pub mod model;
pub mod schedule;
pub mod traits;

#[cfg(feature = "firmware")]
pub mod display;
#[cfg(feature = "firmware")]
pub mod hardware;
