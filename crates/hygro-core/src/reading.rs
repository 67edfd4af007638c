//! The measurement model: one timestamped temperature/humidity reading.
//!
//! A [`Reading`] is created once per cycle by the sensor, handed to the
//! display and the publisher, and dropped at the end of the cycle. It is
//! never queued or persisted. Field validity is explicit: a transducer
//! fault leaves the affected field `None` rather than propagating NaN.

/// One ambient measurement, captured at a monotonic instant.
///
/// Temperature is stored in °C and humidity in %RH, the units the sensor
/// reports. Conversions to the display/publish units (°F, 0–1 fraction)
/// live on this type so every consumer applies exactly the same formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius, `None` if this cycle's read failed.
    pub temperature_celsius: Option<f32>,
    /// Relative humidity in percent (0–100), `None` if the read failed.
    pub relative_humidity_percent: Option<f32>,
    /// Milliseconds since boot at capture time.
    pub captured_at_ms: u64,
}

impl Reading {
    /// A reading with both fields valid.
    pub const fn new(temperature_celsius: f32, relative_humidity_percent: f32, captured_at_ms: u64) -> Self {
        Self {
            temperature_celsius: Some(temperature_celsius),
            relative_humidity_percent: Some(relative_humidity_percent),
            captured_at_ms,
        }
    }

    /// A reading with no valid fields. Consumers skip the cycle.
    pub const fn invalid(captured_at_ms: u64) -> Self {
        Self {
            temperature_celsius: None,
            relative_humidity_percent: None,
            captured_at_ms,
        }
    }

    /// Temperature converted to degrees Fahrenheit: `c * 1.8 + 32`.
    pub fn temperature_fahrenheit(&self) -> Option<f32> {
        self.temperature_celsius.map(|c| c * 1.8 + 32.0)
    }

    /// Humidity normalized to a 0–1 fraction: `pct / 100`.
    pub fn humidity_fraction(&self) -> Option<f32> {
        self.relative_humidity_percent.map(|pct| pct / 100.0)
    }

    /// Whether at least one field carries a usable value.
    pub fn has_valid_field(&self) -> bool {
        self.temperature_celsius.is_some() || self.relative_humidity_percent.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fahrenheit_matches_formula_exactly() {
        for c in [-40.0f32, 0.0, 21.5, 25.0, 37.25, 100.0] {
            let reading = Reading::new(c, 50.0, 0);
            assert_eq!(reading.temperature_fahrenheit(), Some(c * 1.8 + 32.0));
        }
        // Anchors with exact binary results.
        assert_eq!(Reading::new(0.0, 0.0, 0).temperature_fahrenheit(), Some(32.0));
    }

    #[test]
    fn humidity_fraction_matches_formula_exactly() {
        for pct in [0.0f32, 12.5, 48.25, 50.0, 100.0] {
            let reading = Reading::new(20.0, pct, 0);
            assert_eq!(reading.humidity_fraction(), Some(pct / 100.0));
        }
        assert_eq!(Reading::new(0.0, 50.0, 0).humidity_fraction(), Some(0.5));
        assert_eq!(Reading::new(0.0, 100.0, 0).humidity_fraction(), Some(1.0));
    }

    #[test]
    fn invalid_reading_has_no_valid_fields() {
        let reading = Reading::invalid(1234);
        assert!(!reading.has_valid_field());
        assert_eq!(reading.temperature_fahrenheit(), None);
        assert_eq!(reading.humidity_fraction(), None);
        assert_eq!(reading.captured_at_ms, 1234);
    }

    #[test]
    fn partial_reading_is_still_usable() {
        let reading = Reading {
            temperature_celsius: Some(19.0),
            relative_humidity_percent: None,
            captured_at_ms: 0,
        };
        assert!(reading.has_valid_field());
        assert!(reading.temperature_fahrenheit().is_some());
        assert_eq!(reading.humidity_fraction(), None);
    }
}
