//! Sensor abstraction for the temperature/humidity transducer.
//!
//! The firmware crate provides the concrete SHT40 implementation; tests
//! drive the pipeline with scripted mocks.

use thiserror_no_std::Error;

use crate::reading::Reading;

/// Why a sensor read produced no usable data this cycle.
///
/// All variants are transient: the caller skips display and publish for
/// the cycle and the next cycle retries naturally. There is no
/// last-known-good substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The bus transaction failed (NACK, arbitration loss, driver fault).
    #[error("sensor bus transaction failed")]
    Bus,
    /// The transducer answered but the payload checksum did not match.
    #[error("sensor checksum mismatch")]
    Checksum,
    /// The transducer did not answer within the driver's deadline.
    #[error("sensor timed out")]
    Timeout,
}

/// A temperature/humidity transducer.
pub trait Sensor {
    /// Minimum interval between reads, reported by the driver at startup.
    ///
    /// The loop cadence exceeds this by orders of magnitude, so callers
    /// honor it by construction; no gating happens inside the sensor.
    fn min_sample_interval_ms(&self) -> u64;

    /// Take one measurement.
    ///
    /// A failed read returns [`SensorError`]; it never substitutes a
    /// cached value.
    async fn read(&mut self) -> Result<Reading, SensorError>;
}
