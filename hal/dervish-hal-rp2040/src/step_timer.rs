//! Step pulse timer on TIMER alarm 1
//!
//! The embassy time driver owns alarm 0. Alarm 1 fires `TIMER_IRQ_1`, whose
//! handler runs [`PulseGenerator::on_timer`] against the installed step
//! output and re-arms itself with the returned delay.
//!
//! ```text
//! control loop ──set_velocity──▶ PULSE_GENERATOR ◀──on_timer── TIMER_IRQ_1
//!              ──kick─────────▶ StepTimer::fire_in ──alarm 1──▶
//! ```

use core::cell::RefCell;

use dervish_core::motion::pulse::IDLE_PERIOD_US;
use dervish_core::motion::PulseGenerator;
use dervish_core::traits::{PulseTimer, StepOutput};
use embassy_rp::interrupt;
use embassy_rp::interrupt::InterruptExt;
use embassy_rp::pac;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

const ALARM: usize = 1;

/// Pulse train state shared by the control loop and the interrupt
pub static PULSE_GENERATOR: PulseGenerator = PulseGenerator::new();

type SharedOutput = &'static mut (dyn StepOutput + Send);

static STEP_OUTPUT: Mutex<CriticalSectionRawMutex, RefCell<Option<SharedOutput>>> =
    Mutex::new(RefCell::new(None));

/// Handle to alarm 1
///
/// Obtained from [`init`]; every copy drives the same alarm.
#[derive(Clone, Copy)]
pub struct StepTimer {
    _private: (),
}

/// Install the step output and start the interrupt
///
/// Call once at boot. The first firing happens after `IDLE_PERIOD_US`
/// and keeps the step line low until a velocity is published.
pub fn init(output: SharedOutput) -> StepTimer {
    STEP_OUTPUT.lock(|cell| *cell.borrow_mut() = Some(output));

    pac::TIMER.intr().write(|w| w.set_alarm(ALARM, true));
    pac::TIMER.inte().modify(|w| w.set_alarm(ALARM, true));
    interrupt::TIMER_IRQ_1.unpend();
    // SAFETY: the handler only touches PULSE_GENERATOR and STEP_OUTPUT
    unsafe { interrupt::TIMER_IRQ_1.enable() };

    let mut timer = StepTimer { _private: () };
    timer.fire_in(IDLE_PERIOD_US);
    timer
}

/// Arm alarm 1 `delay_us` from now
///
/// The alarm compares only the low 32 bits of the counter, so a deadline
/// that already passed is pended by hand instead of waiting for a wrap.
fn arm(delay_us: u32) {
    let now = pac::TIMER.timerawl().read();
    let deadline = now.wrapping_add(delay_us.max(1));
    pac::TIMER.alarm(ALARM).write_value(deadline);

    let after = pac::TIMER.timerawl().read();
    if after.wrapping_sub(now) >= delay_us {
        pac::TIMER.armed().write(|w| w.set_armed(1 << ALARM));
        interrupt::TIMER_IRQ_1.pend();
    }
}

impl PulseTimer for StepTimer {
    fn fire_in(&mut self, delay_us: u32) {
        cortex_m::interrupt::free(|_| arm(delay_us));
    }
}

#[interrupt]
fn TIMER_IRQ_1() {
    pac::TIMER.intr().write(|w| w.set_alarm(ALARM, true));

    let delay_us = STEP_OUTPUT.lock(|cell| match cell.borrow_mut().as_mut() {
        Some(output) => PULSE_GENERATOR.on_timer(&mut **output),
        None => IDLE_PERIOD_US,
    });

    arm(delay_us);
}
