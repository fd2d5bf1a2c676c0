//! Temperature source trait

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor disconnected (open circuit)
    OpenCircuit,
    /// Sensor shorted to ground
    ShortCircuit,
    /// Reading out of expected range
    OutOfRange,
    /// ADC conversion error
    ConversionError,
}

/// Latest known process temperature
///
/// Polled once per control tick, so implementations return a cached value
/// and never start a conversion here.
pub trait TemperatureSource {
    /// True once a valid reading is available
    fn has_reading(&self) -> bool;

    /// Temperature in °C, NaN if unknown
    fn temp_c(&self) -> f32;

    /// The reading, if known and finite
    fn reading(&self) -> Option<f32> {
        let t = self.temp_c();
        (self.has_reading() && t.is_finite()).then_some(t)
    }
}

/// A source with no sensor attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl TemperatureSource for NoSensor {
    fn has_reading(&self) -> bool {
        false
    }

    fn temp_c(&self) -> f32 {
        f32::NAN
    }
}

/// Fixed reading, mainly for tests and bench setups
#[derive(Debug, Clone, Copy)]
pub struct FixedTemperature(pub f32);

impl TemperatureSource for FixedTemperature {
    fn has_reading(&self) -> bool {
        true
    }

    fn temp_c(&self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_filters_invalid() {
        assert_eq!(NoSensor.reading(), None);
        assert_eq!(FixedTemperature(f32::NAN).reading(), None);
        assert_eq!(FixedTemperature(21.5).reading(), Some(21.5));
    }
}
