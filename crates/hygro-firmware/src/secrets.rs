//! Build-time device configuration.
//!
//! The build script forwards the variables from `.env` (or the
//! environment) as `rustc-env` values, so credentials are baked into
//! the binary and never touch the filesystem at runtime.

use hygro_core::config::{ApiConfig, Config, InternetConfig, ScheduleConfig, parse_fingerprint};

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
const API_HOST: &str = env!("API_HOST");
const API_TOKEN: &str = env!("API_TOKEN");
const API_DOC_ID: &str = env!("API_DOC_ID");
const API_TABLE_ID: &str = env!("API_TABLE_ID");
const API_TEMP_COLUMN_ID: &str = env!("API_TEMP_COLUMN_ID");
const API_HUMIDITY_COLUMN_ID: &str = env!("API_HUMIDITY_COLUMN_ID");
const API_CERT_SHA256: &str = env!("API_CERT_SHA256");

/// Assemble the device configuration from the baked-in values.
///
/// Returns `None` if the certificate fingerprint does not parse; a
/// device without a usable pin must not publish at all.
pub fn device_config() -> Option<Config<'static>> {
    let certificate_sha256 = parse_fingerprint(API_CERT_SHA256)?;
    Some(Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        api: ApiConfig {
            host: API_HOST,
            bearer_token: API_TOKEN,
            doc_id: API_DOC_ID,
            table_id: API_TABLE_ID,
            temperature_column_id: API_TEMP_COLUMN_ID,
            humidity_column_id: API_HUMIDITY_COLUMN_ID,
            certificate_sha256,
        },
        schedule: ScheduleConfig::default(),
    })
}
