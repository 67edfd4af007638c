//! Device configuration.
//!
//! Everything here is fixed at compile time: the firmware fills these
//! structs from `env!` constants baked in by its build script. There is
//! no runtime reconfiguration surface.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub api: ApiConfig<'a>,
    pub schedule: ScheduleConfig,
}

/// Station-mode join credentials.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Remote tabular-data API coordinates and credentials.
///
/// Column identifiers are opaque strings naming the target table's
/// schema locations; the payload maps the temperature cell to
/// `temperature_column_id` and the humidity cell to
/// `humidity_column_id`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ApiConfig<'a> {
    /// API host, e.g. `coda.io`. Also used for SNI and the `Host` header.
    pub host: &'a str,
    /// Bearer token for the `Authorization` header.
    pub bearer_token: &'a str,
    pub doc_id: &'a str,
    pub table_id: &'a str,
    pub temperature_column_id: &'a str,
    pub humidity_column_id: &'a str,
    /// SHA-256 fingerprint of the server's leaf certificate. The TLS
    /// layer rejects any handshake whose certificate does not match.
    pub certificate_sha256: [u8; 32],
}

/// Cadence of the sense/display/publish loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ScheduleConfig {
    /// Delay between steady-state cycles.
    pub publish_interval_ms: u64,
    /// Delay between join-status polls during startup.
    pub join_poll_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 5 * 60 * 1000,
            join_poll_interval_ms: 500,
        }
    }
}

/// Parse a SHA-256 certificate fingerprint from hex.
///
/// Accepts the common `AA:BB:...` colon-separated form as well as bare
/// hex, upper or lower case. Returns `None` unless exactly 32 bytes are
/// present.
pub fn parse_fingerprint(text: &str) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    let mut nibbles = 0usize;
    for ch in text.chars() {
        if ch == ':' || ch == ' ' {
            continue;
        }
        let value = ch.to_digit(16)? as u8;
        if nibbles >= 64 {
            return None;
        }
        let byte = &mut out[nibbles / 2];
        *byte = (*byte << 4) | value;
        nibbles += 1;
    }
    if nibbles == 64 { Some(out) } else { None }
}
