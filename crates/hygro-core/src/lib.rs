//! Hardware-independent core library for hygro-rs
//!
//! This crate contains all platform-agnostic logic for the hygro
//! temperature/humidity logging device: the reading model and unit
//! conversions, the sensor and publisher traits, the WiFi join state
//! machine, the row-append wire encoding and HTTP response
//! classification, display rendering, and the startup/steady-state
//! pipeline.
//!
//! It is `#![no_std]` so it compiles on both embedded targets
//! (ESP32-S3) and desktop hosts (for tests).

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod display;
pub mod pipeline;
pub mod publish;
pub mod reading;
pub mod sensor;
pub mod wifi;
