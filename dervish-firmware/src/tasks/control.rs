//! Control loop task
//!
//! Owns the core [`Controller`] and runs it every 10 ms:
//! - Applies queued commands and hands config changes to the persist task
//! - Feeds the latest calibrated temperature
//! - Publishes events and the status snapshot
//! - Watches the step interrupt and re-kicks it if it stalls

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Instant, Ticker};

use dervish_core::config::{MotionProfile, SessionSettings};
use dervish_core::controller::{CommandOutcome, Controller};
use dervish_core::motion::{PulseDriver, PulseWatchdog};
use dervish_core::traits::{StepperDriver, TemperatureSource};
use dervish_hal_rp2040::step_timer::{StepTimer, PULSE_GENERATOR};

use crate::channels::{COMMAND_CHANNEL, EVENT_CHANNEL, SETTINGS_CHANGED, STATUS, TEMP_READING};

/// Control tick interval in milliseconds
pub const CONTROL_TICK_MS: u64 = 10;

/// Latest thermistor reading with the calibration offset applied
///
/// NaN until the first reading and after a sensor fault.
#[derive(Debug, Clone, Copy)]
pub struct LatestTemperature {
    temp_c: f32,
}

impl Default for LatestTemperature {
    fn default() -> Self {
        Self { temp_c: f32::NAN }
    }
}

impl LatestTemperature {
    pub fn update(&mut self, reading: Option<f32>, offset_c: f32) {
        self.temp_c = reading.map_or(f32::NAN, |t| t + offset_c);
    }
}

impl TemperatureSource for LatestTemperature {
    fn has_reading(&self) -> bool {
        !self.temp_c.is_nan()
    }

    fn temp_c(&self) -> f32 {
        self.temp_c
    }
}

/// Stepper driver enable line (active low)
pub struct DriverEnable(pub Output<'static>);

impl DriverEnable {
    fn set(&mut self, enabled: bool) {
        if enabled {
            self.0.set_low();
        } else {
            self.0.set_high();
        }
    }
}

/// Control task - runs the motion and session controller
#[embassy_executor::task]
pub async fn control_task(
    profile: MotionProfile,
    settings: SessionSettings,
    timer: StepTimer,
    mut enable: DriverEnable,
) {
    info!("Control task started");

    let driver = PulseDriver::new(&PULSE_GENERATOR, timer);
    let mut controller = Controller::new(driver, profile, settings);
    let mut temperature = LatestTemperature::default();
    let mut watchdog = PulseWatchdog::new();
    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));
    let mut last = Instant::now();

    loop {
        ticker.next().await;
        let now = Instant::now();
        let dt_ms = (now - last).as_millis() as u32;
        last = now;

        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            debug!("Command: {:?}", command);
            match controller.apply(command) {
                CommandOutcome::Applied => {}
                CommandOutcome::ConfigChanged => {
                    SETTINGS_CHANGED
                        .signal((*controller.profile(), controller.settings().clone()));
                }
                CommandOutcome::Rejected(e) => warn!("Command rejected: {:?}", e),
            }
        }

        if let Some(reading) = TEMP_READING.try_take() {
            temperature.update(reading, controller.profile().temp_offset_c);
        }

        let events = controller.tick(dt_ms, &temperature);
        for event in events {
            info!("Event: {:?}", event);
            if EVENT_CHANNEL.try_send(event).is_err() {
                warn!("Event channel full, dropped {:?}", event);
            }
        }

        enable.set(controller.ramp().is_running());

        if watchdog.check(dt_ms, &PULSE_GENERATOR) {
            warn!(
                "Step interrupt stalled ({} fires), kicking timer",
                PULSE_GENERATOR.fire_count()
            );
            controller.driver_mut().kick();
        }

        STATUS.signal(controller.status());
    }
}
