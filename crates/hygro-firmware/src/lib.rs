//! ESP32-S3 firmware-specific modules for hygro-rs
//!
//! This crate contains hardware-specific code that cannot compile on
//! desktop targets: peripheral bring-up, the SHT40 driver binding, the
//! esp-radio WiFi plumbing, and the pinned-certificate TLS transport
//! behind the publisher.

#![no_std]

pub mod publisher;
pub mod secrets;
pub mod sensor;
pub mod tls;
pub mod wifi;
