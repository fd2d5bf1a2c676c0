//! Dervish - Agitation Rotation Base Firmware
//!
//! Main firmware binary for RP2040-based rotation bases. Drives one stepper
//! through eased start, stop and soft-reverse ramps while a multi-step
//! session scheduler times the process and watches the bath temperature.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use dervish_core::config::{MotionProfile, SessionSettings};
use dervish_core::traits::SettingsStore;
use dervish_drivers::buzzer::BuzzerConfig;
use dervish_drivers::sensor::Ntc100k;
use dervish_drivers::stepper::StepDirPins;
use dervish_hal_rp2040::flash::Rp2040FlashStorage;
use dervish_hal_rp2040::step_timer;

use crate::config::ConfigPersistence;
use crate::tasks::control::DriverEnable;

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

type StepPins = StepDirPins<Output<'static>, Output<'static>, Delay>;

// Step pins are borrowed by the step timer interrupt for the life of the program
static STEP_PINS: StaticCell<StepPins> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Dervish firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Load configuration from flash (or use defaults)
    let mut store = ConfigPersistence::new(Rp2040FlashStorage::new(p.FLASH, p.DMA_CH0));
    let (profile, settings) = match store.load().await {
        Ok(loaded) => loaded,
        Err(e) => {
            info!("No valid configuration in flash ({:?}), using defaults", e);
            (MotionProfile::default(), SessionSettings::default())
        }
    };

    // Stepper pins are board-specific (SKR Pico: STEP=GPIO11, DIR=GPIO10, ENABLE=GPIO12)
    let pins = STEP_PINS.init(StepDirPins::new(
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_10, Level::Low),
        Delay,
    ));
    let timer = step_timer::init(pins);
    // Enable is active low; start disabled
    let enable = DriverEnable(Output::new(p.PIN_12, Level::High));
    info!("Step timer initialized");

    // Thermistor on TH0 (GPIO27)
    let adc = Adc::new(p.ADC, Irqs, embassy_rp::adc::Config::default());
    let therm_channel = Channel::new_pin(p.PIN_27, Pull::None);

    // Active buzzer on GPIO22
    let buzzer_pin = Output::new(p.PIN_22, Level::Low);

    spawner
        .spawn(tasks::control_task(profile, settings, timer, enable))
        .unwrap();
    spawner
        .spawn(tasks::temperature_task(adc, therm_channel, Ntc100k::default()))
        .unwrap();
    spawner
        .spawn(tasks::buzzer_task(buzzer_pin, BuzzerConfig::default()))
        .unwrap();
    spawner.spawn(tasks::persist_task(store)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
