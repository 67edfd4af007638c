//! Bakes device configuration into the binary.
//!
//! Values come from the process environment, falling back to a local
//! `.env` file via dotenvy. Missing values get inert defaults so the
//! firmware still builds; the all-zero certificate fingerprint matches
//! no real server, so a misconfigured build fails closed at publish
//! time.

use std::env;

const CONFIG_VARS: &[(&str, &str)] = &[
    ("WIFI_SSID", "changeme"),
    ("WIFI_PASSWORD", "changeme"),
    ("API_HOST", "coda.io"),
    ("API_TOKEN", ""),
    ("API_DOC_ID", ""),
    ("API_TABLE_ID", ""),
    ("API_TEMP_COLUMN_ID", ""),
    ("API_HUMIDITY_COLUMN_ID", ""),
    (
        "API_CERT_SHA256",
        "0000000000000000000000000000000000000000000000000000000000000000",
    ),
];

fn main() {
    let _ = dotenvy::dotenv();

    for (key, default) in CONFIG_VARS {
        let value = env::var(key).unwrap_or_else(|_| (*default).to_owned());
        println!("cargo:rustc-env={key}={value}");
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");
}
