//! Bath temperature task
//!
//! Samples the NTC thermistor once per second and publishes the reading.
//! The calibration offset is applied by the control task, so it follows
//! profile changes without a restart.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_time::{Duration, Ticker};

use dervish_core::traits::SensorError;
use dervish_drivers::sensor::Ntc100k;

use crate::channels::TEMP_READING;

/// Sample interval in milliseconds
pub const SAMPLE_INTERVAL_MS: u64 = 1000;

/// Temperature task - reads the thermistor and signals `TEMP_READING`
#[embassy_executor::task]
pub async fn temperature_task(
    mut adc: Adc<'static, Async>,
    mut channel: Channel<'static>,
    ntc: Ntc100k,
) {
    info!("Temperature task started");

    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_INTERVAL_MS));
    let mut faulted = false;

    loop {
        let reading = adc
            .read(&mut channel)
            .await
            .map_err(|_| SensorError::ConversionError)
            .and_then(|raw| ntc.celsius(raw));

        match reading {
            Ok(temp_c) => {
                if faulted {
                    info!("Thermistor reading restored");
                }
                faulted = false;
                trace!("Temperature: {} C", temp_c);
                TEMP_READING.signal(Some(temp_c));
            }
            Err(e) => {
                if !faulted {
                    warn!("Thermistor fault: {:?}", e);
                }
                faulted = true;
                TEMP_READING.signal(None);
            }
        }

        ticker.next().await;
    }
}
