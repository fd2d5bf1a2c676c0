//! NTC 100K thermistor
//!
//! The bath thermistor sits in a divider under a pull-up to the ADC
//! reference. Conversion uses a lookup table with integer interpolation,
//! dense around processing temperatures.

use dervish_core::traits::SensorError;

/// NTC 100K (B = 3950) lookup table
///
/// Table format: (resistance_ohms, temperature_x10), sorted by decreasing
/// resistance. Generated from the beta equation with R0 = 100 kΩ at 25°C.
///
/// Temperature range: -10°C to 100°C
const TEMP_TABLE: &[(u32, i16)] = &[
    (582_457, -100), // -10°C
    (336_206, 0),
    (259_246, 50),
    (201_746, 100),
    (158_371, 150),
    (137_510, 180),
    (125_353, 200),
    (114_415, 220),
    (104_559, 240),
    (100_000, 250), // R0
    (95_668, 260),
    (87_636, 280),
    (80_371, 300),
    (65_055, 350),
    (57_492, 380), // C-41
    (53_015, 400),
    (43_481, 450),
    (35_882, 500),
    (24_862, 600),
    (17_598, 700),
    (12_703, 800),
    (6_975, 1000),
];

/// ADC counts this close to either rail are treated as a wiring fault
const RAIL_MARGIN: u16 = 10;

/// NTC 100K thermistor divider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ntc100k {
    /// Pull-up resistor value in ohms
    pub pullup_ohms: u32,
    /// ADC full scale (4096 for 12-bit)
    pub adc_max: u16,
}

impl Default for Ntc100k {
    fn default() -> Self {
        Self {
            pullup_ohms: 4_700,
            adc_max: 4_096,
        }
    }
}

impl Ntc100k {
    /// Convert an ADC reading to thermistor resistance
    ///
    /// Circuit: VCC -- pullup -- ADC_PIN -- NTC -- GND
    /// R_ntc = R_pullup * adc_value / (adc_max - adc_value)
    pub fn adc_to_resistance(&self, adc_value: u16) -> Result<u32, SensorError> {
        if adc_value >= self.adc_max.saturating_sub(RAIL_MARGIN) {
            return Err(SensorError::OpenCircuit);
        }
        if adc_value < RAIL_MARGIN {
            return Err(SensorError::ShortCircuit);
        }

        let numerator = self.pullup_ohms as u64 * adc_value as u64;
        let denominator = (self.adc_max - adc_value) as u64;
        Ok((numerator / denominator) as u32)
    }

    /// Temperature in 0.1°C units (e.g. 250 = 25.0°C) for a resistance
    pub fn resistance_to_temp_x10(resistance: u32) -> Result<i16, SensorError> {
        let (coldest, _) = TEMP_TABLE[0];
        let (hottest, _) = TEMP_TABLE[TEMP_TABLE.len() - 1];
        if resistance > coldest || resistance < hottest {
            return Err(SensorError::OutOfRange);
        }

        for pair in TEMP_TABLE.windows(2) {
            let (r_high, t_low) = pair[0];
            let (r_low, t_high) = pair[1];

            if resistance <= r_high && resistance >= r_low {
                // temp = t_low + (t_high - t_low) * (r_high - r) / (r_high - r_low)
                let r_range = (r_high - r_low) as i32;
                let t_range = (t_high - t_low) as i32;
                let r_offset = (r_high - resistance) as i32;
                return Ok(t_low + (t_range * r_offset / r_range) as i16);
            }
        }

        Err(SensorError::OutOfRange)
    }

    /// Temperature in °C for an ADC reading
    pub fn celsius(&self, adc_value: u16) -> Result<f32, SensorError> {
        let resistance = self.adc_to_resistance(adc_value)?;
        let x10 = Self::resistance_to_temp_x10(resistance)?;
        Ok(x10 as f32 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistance_to_temp() {
        assert_eq!(Ntc100k::resistance_to_temp_x10(100_000).unwrap(), 250);
        assert_eq!(Ntc100k::resistance_to_temp_x10(57_492).unwrap(), 380);

        // Between 20°C and 22°C
        let t = Ntc100k::resistance_to_temp_x10(120_000).unwrap();
        assert!(t > 200 && t < 220);
    }

    #[test]
    fn test_table_is_monotonic() {
        for pair in TEMP_TABLE.windows(2) {
            assert!(pair[0].0 > pair[1].0);
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            Ntc100k::resistance_to_temp_x10(2_000_000),
            Err(SensorError::OutOfRange)
        );
        assert_eq!(
            Ntc100k::resistance_to_temp_x10(1_000),
            Err(SensorError::OutOfRange)
        );
    }

    #[test]
    fn test_adc_at_room_temperature() {
        let ntc = Ntc100k::default();
        // 100K under a 4.7K pull-up: 4096 * 100 / 104.7 ≈ 3912
        let t = ntc.celsius(3912).unwrap();
        assert!((t - 25.0).abs() < 0.5);
    }

    #[test]
    fn test_wiring_faults() {
        let ntc = Ntc100k::default();
        assert_eq!(ntc.adc_to_resistance(4095), Err(SensorError::OpenCircuit));
        assert_eq!(ntc.adc_to_resistance(0), Err(SensorError::ShortCircuit));
        assert_eq!(ntc.celsius(4090), Err(SensorError::OpenCircuit));
    }
}
