//! Buzzer task
//!
//! Plays a click when a step finishes and a double click when the session
//! ends or a temperature alarm fires with an audible action.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Output;
use embassy_time::{Instant, Timer};

use dervish_drivers::buzzer::{Buzzer, BuzzerConfig, Pattern};

use crate::channels::EVENT_CHANNEL;

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Buzzer task - turns controller events into click patterns
#[embassy_executor::task]
pub async fn buzzer_task(pin: Output<'static>, config: BuzzerConfig) {
    info!("Buzzer task started");

    let mut buzzer = Buzzer::new(pin, config);

    loop {
        let event = match buzzer.next_edge_in(now_ms()) {
            None => Some(EVENT_CHANNEL.receive().await),
            Some(wait_ms) => {
                match select(EVENT_CHANNEL.receive(), Timer::after_millis(wait_ms as u64)).await {
                    Either::First(event) => Some(event),
                    Either::Second(()) => None,
                }
            }
        };

        let now = now_ms();
        if let Some(pattern) = event.as_ref().and_then(Pattern::for_event) {
            debug!("Buzzer: {:?}", pattern);
            buzzer.play(pattern, now);
        }
        buzzer.tick(now);
    }
}
