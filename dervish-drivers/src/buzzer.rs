//! Active buzzer driver
//!
//! Non-blocking click patterns on a plain GPIO. [`Buzzer::tick`] is called
//! with a millisecond clock and switches the pin at pattern edges; nothing
//! here ever waits.

use dervish_core::state::Event;
use embedded_hal::digital::OutputPin;

/// Buzzer timing and polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuzzerConfig {
    /// Pin level that sounds the buzzer
    pub active_high: bool,
    /// Length of one click (ms)
    pub click_ms: u16,
    /// Silence between the clicks of a double click (ms)
    pub gap_ms: u16,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            active_high: true,
            click_ms: 25,
            gap_ms: 40,
        }
    }
}

/// Click pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pattern {
    Click,
    DoubleClick,
}

impl Pattern {
    /// Pattern to play for a controller event, if any
    pub fn for_event(event: &Event) -> Option<Self> {
        if !event.wants_attention() {
            return None;
        }
        match event {
            Event::StepFinished { .. } => Some(Pattern::Click),
            _ => Some(Pattern::DoubleClick),
        }
    }

    fn clicks(self) -> u8 {
        match self {
            Pattern::Click => 1,
            Pattern::DoubleClick => 2,
        }
    }
}

/// Buzzer on a GPIO
pub struct Buzzer<P> {
    pin: P,
    config: BuzzerConfig,
    /// Clicks still to start, including the one sounding
    remaining: u8,
    sounding: bool,
    /// Clock of the next pin edge (ms)
    next_edge_ms: u32,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(pin: P, config: BuzzerConfig) -> Self {
        let mut buzzer = Self {
            pin,
            config,
            remaining: 0,
            sounding: false,
            next_edge_ms: 0,
        };
        buzzer.set(false);
        buzzer
    }

    /// True while a pattern is playing
    pub fn is_busy(&self) -> bool {
        self.remaining > 0
    }

    /// Start `pattern` now, replacing whatever was playing
    pub fn play(&mut self, pattern: Pattern, now_ms: u32) {
        self.remaining = pattern.clicks();
        self.start_click(now_ms);
    }

    pub fn click(&mut self, now_ms: u32) {
        self.play(Pattern::Click, now_ms);
    }

    pub fn double_click(&mut self, now_ms: u32) {
        self.play(Pattern::DoubleClick, now_ms);
    }

    /// Advance the pattern to `now_ms`
    pub fn tick(&mut self, now_ms: u32) {
        if self.remaining == 0 || (now_ms.wrapping_sub(self.next_edge_ms) as i32) < 0 {
            return;
        }

        if self.sounding {
            self.set(false);
            self.remaining -= 1;
            self.next_edge_ms = now_ms.wrapping_add(self.config.gap_ms as u32);
        } else {
            self.start_click(now_ms);
        }
    }

    /// Milliseconds until the next edge, `None` when idle
    pub fn next_edge_in(&self, now_ms: u32) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let delta = self.next_edge_ms.wrapping_sub(now_ms) as i32;
        Some(delta.max(0) as u32)
    }

    /// Silence immediately and drop any pattern
    pub fn silence(&mut self) {
        self.remaining = 0;
        self.set(false);
    }

    fn start_click(&mut self, now_ms: u32) {
        self.set(true);
        self.next_edge_ms = now_ms.wrapping_add(self.config.click_ms as u32);
    }

    fn set(&mut self, on: bool) {
        self.sounding = on;
        let _ = if on == self.config.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use dervish_core::config::AlarmAction;
    use dervish_core::session::AlarmFlags;
    use std::vec::Vec;

    #[derive(Default)]
    struct Pin {
        levels: Vec<bool>,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.levels.push(true);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.levels.push(false);
            Ok(())
        }
    }

    fn make_buzzer() -> Buzzer<Pin> {
        Buzzer::new(Pin::default(), BuzzerConfig::default())
    }

    fn run(buzzer: &mut Buzzer<Pin>, from_ms: u32, to_ms: u32) {
        for now in from_ms..to_ms {
            buzzer.tick(now);
        }
    }

    #[test]
    fn test_click() {
        let mut b = make_buzzer();
        b.click(1000);
        assert!(b.is_busy());
        run(&mut b, 1000, 1024);
        assert!(b.sounding);
        b.tick(1025);
        assert!(!b.sounding);
        assert!(!b.is_busy());
        assert_eq!(b.pin.levels, [false, true, false]);
    }

    #[test]
    fn test_double_click_timing() {
        let mut b = make_buzzer();
        b.double_click(0);
        run(&mut b, 0, 200);
        assert!(!b.is_busy());
        assert_eq!(b.pin.levels, [false, true, false, true, false]);
    }

    #[test]
    fn test_active_low() {
        let config = BuzzerConfig {
            active_high: false,
            ..Default::default()
        };
        let mut b = Buzzer::new(Pin::default(), config);
        b.click(0);
        run(&mut b, 0, 100);
        assert_eq!(b.pin.levels, [true, false, true]);
    }

    #[test]
    fn test_clock_wrap() {
        let mut b = make_buzzer();
        b.click(u32::MAX - 10);
        b.tick(u32::MAX);
        assert!(b.sounding);
        b.tick(20);
        assert!(!b.sounding);
        assert_eq!(b.next_edge_in(20), None);
    }

    #[test]
    fn test_event_patterns() {
        assert_eq!(
            Pattern::for_event(&Event::StepFinished { index: 0 }),
            Some(Pattern::Click)
        );
        assert_eq!(
            Pattern::for_event(&Event::SessionEnded),
            Some(Pattern::DoubleClick)
        );
        let alarm = |action| Event::AlarmStarted {
            flags: AlarmFlags {
                low: false,
                high: true,
            },
            action,
        };
        assert_eq!(
            Pattern::for_event(&alarm(Some(AlarmAction::Beep))),
            Some(Pattern::DoubleClick)
        );
        assert_eq!(Pattern::for_event(&alarm(Some(AlarmAction::None))), None);
        assert_eq!(Pattern::for_event(&Event::AlarmCleared), None);
    }
}
