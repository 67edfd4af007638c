//! SHT40 temperature/humidity sensor binding.

use embassy_time::Instant;
use embedded_hal_async::i2c::I2c;
use hygro_core::reading::Reading;
use hygro_core::sensor::{Sensor, SensorError};
use sht4x::Sht4xAsync;

/// Sampling floor reported to the pipeline. The SHT40 tolerates much
/// faster reads, but self-heating degrades the humidity accuracy below
/// about one second per sample.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 1_000;

pub struct Sht40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

impl<I: I2c> Sensor for Sht40Sensor<I> {
    fn min_sample_interval_ms(&self) -> u64 {
        MIN_SAMPLE_INTERVAL_MS
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                log::error!("SHT40 measurement failed: {:?}", e);
                SensorError::Bus
            })?;

        let temperature_celsius = measurement.temperature_celsius().to_num::<f32>();
        let humidity_percent = measurement.humidity_percent().to_num::<f32>();

        Ok(Reading::new(
            temperature_celsius,
            humidity_percent,
            Instant::now().as_millis(),
        ))
    }
}
