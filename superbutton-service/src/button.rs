//! Per-button state record, debounce filter and click classification
//!
//! Every pass over a button works on explicit ticks and never blocks or
//! allocates, so the same code runs for sample-driven and timeout-driven
//! evaluation.

use embassy_time::{Duration, Instant};
use embedded_hal_1::digital::PinState;

use crate::config::Config;
use crate::event::{ClickEvent, ClickKind, PinId, Tag};

/// Electrical level read from a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RawLevel {
    /// Pin reads low
    Low,
    /// Pin reads high
    High,
}

impl From<bool> for RawLevel {
    fn from(is_high: bool) -> Self {
        if is_high {
            RawLevel::High
        } else {
            RawLevel::Low
        }
    }
}

impl From<PinState> for RawLevel {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => RawLevel::Low,
            PinState::High => RawLevel::High,
        }
    }
}

/// Logical button level after polarity correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonLevel {
    /// Released
    Up,
    /// Pressed
    Down,
    /// No sample seen yet
    Undefined,
}

/// State record of one monitored button, owned by the engine.
#[derive(Debug, Clone)]
pub struct ButtonState {
    pin: PinId,
    tag: Tag,
    current_level: ButtonLevel,
    last_confirmed_level: ButtonLevel,
    current_tick: Instant,
    last_confirmed_tick: Instant,
    click_count: u16,
    pending_click_type: Option<ClickKind>,
    is_active: bool,
    // Debounce only runs against a level change the engine confirmed itself
    has_confirmed_change: bool,
}

impl ButtonState {
    /// Creates the record for a button that has not produced a sample yet.
    pub fn new(pin: PinId, tag: Tag) -> Self {
        Self {
            pin,
            tag,
            current_level: ButtonLevel::Undefined,
            last_confirmed_level: ButtonLevel::Undefined,
            current_tick: Instant::from_ticks(0),
            last_confirmed_tick: Instant::from_ticks(0),
            click_count: 0,
            pending_click_type: None,
            is_active: false,
            has_confirmed_change: false,
        }
    }

    /// Pin this record monitors.
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Caller context registered with the pin.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Last confirmed level.
    pub fn level(&self) -> ButtonLevel {
        self.last_confirmed_level
    }

    /// Clicks accumulated in the current multi-click window.
    pub fn click_count(&self) -> u16 {
        self.click_count
    }

    /// Whether the button still needs time-driven evaluation.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Uses a level read at boot as the confirmed baseline.
    ///
    /// A button held down at boot counts as pressed at `tick`: it stays active
    /// so a long press can start without a new edge. The baseline is not a level
    /// change, so the first edge after it is not debounced.
    pub fn prime(&mut self, level: ButtonLevel, tick: Instant) {
        self.current_level = level;
        self.last_confirmed_level = level;
        self.current_tick = tick;
        self.last_confirmed_tick = tick;
        self.click_count = 0;
        self.pending_click_type = None;
        self.is_active = level == ButtonLevel::Down;
        self.has_confirmed_change = false;
    }

    /// Debounce filter. Returns `false` and leaves the record untouched when the
    /// sample arrives within `debounce` of the last confirmed change.
    ///
    /// Samples are accepted unconditionally until the first confirmed change,
    /// whether or not the button was primed.
    pub fn accept(&mut self, level: ButtonLevel, tick: Instant, debounce: Duration) -> bool {
        if self.has_confirmed_change
            && tick.saturating_duration_since(self.last_confirmed_tick) < debounce
        {
            return false;
        }

        self.current_level = level;
        self.current_tick = tick;
        self.is_active = true;
        true
    }

    /// Decision pass: classifies the button state as seen at `reference`.
    ///
    /// `reference` is the tick of the sample that triggered the pass, or the
    /// wall clock for timeout-driven passes.
    pub fn evaluate(&mut self, reference: Instant, config: &Config, mut emit: impl FnMut(ClickEvent)) {
        let period = reference.saturating_duration_since(self.last_confirmed_tick);
        let changed = self.current_level != self.last_confirmed_level;

        trace!(
            "pin {} evaluate: level {:?}, confirmed {:?}, period {} ms, clicks {}",
            self.pin.0,
            self.current_level,
            self.last_confirmed_level,
            period.as_millis(),
            self.click_count
        );

        if changed {
            let kind = match self.current_level {
                ButtonLevel::Down => ClickKind::Down,
                _ => ClickKind::Up,
            };
            self.report(kind, period, &mut emit);

            if self.current_level == ButtonLevel::Up && self.last_confirmed_level == ButtonLevel::Down {
                self.click_count = self.click_count.saturating_add(1);
            }
        }

        let held = self.current_level == ButtonLevel::Down && self.last_confirmed_level == ButtonLevel::Down;

        if period >= config.long_press_start_gap {
            if held {
                if self.pending_click_type != Some(ClickKind::LongPressStart) {
                    self.report(ClickKind::LongPressStart, period, &mut emit);
                }
                self.click_count = 0;
                self.is_active = false;
            } else if self.click_count == 1 {
                self.report(ClickKind::LongClick, period, &mut emit);
                self.click_count = 0;
                self.is_active = false;
            } else {
                // Sequence went stale without a new edge
                if self.click_count > 1 {
                    self.report(ClickKind::MultiClick, period, &mut emit);
                    self.click_count = 0;
                }
                if self.current_level == ButtonLevel::Up {
                    self.is_active = false;
                }
            }
        } else if period >= config.multi_click_gap {
            if self.click_count > 0 {
                let kind = if self.click_count == 1 {
                    ClickKind::SingleClick
                } else {
                    ClickKind::MultiClick
                };
                self.report(kind, period, &mut emit);
                self.click_count = 0;
            }
            if self.current_level == ButtonLevel::Up {
                self.is_active = false;
            }
        }

        if changed {
            self.last_confirmed_level = self.current_level;
            self.last_confirmed_tick = self.current_tick;
            self.has_confirmed_change = true;
        }
    }

    fn report(&mut self, kind: ClickKind, period: Duration, emit: &mut impl FnMut(ClickEvent)) {
        self.pending_click_type = Some(kind);
        emit(ClickEvent {
            pin: self.pin,
            tag: self.tag,
            kind,
            click_count: self.click_count,
            duration: period,
        });

        // Only a started long press stays pending, it blocks a repeat until the next edge
        if kind != ClickKind::LongPressStart {
            self.pending_click_type = None;
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    const PIN: PinId = PinId(4);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn kinds(events: &[ClickEvent]) -> Vec<ClickKind> {
        events.iter().map(|e| e.kind).collect()
    }

    /// Feeds one sample through the filter and, if accepted, the decision pass.
    fn feed(button: &mut ButtonState, level: ButtonLevel, ms: u64, events: &mut Vec<ClickEvent>) -> bool {
        let config = Config::default();
        if !button.accept(level, at(ms), config.debounce) {
            return false;
        }
        button.evaluate(at(ms), &config, |e| events.push(e));
        true
    }

    fn wake(button: &mut ButtonState, ms: u64, events: &mut Vec<ClickEvent>) {
        button.evaluate(at(ms), &Config::default(), |e| events.push(e));
    }

    #[test]
    fn first_sample_skips_debounce() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();

        assert!(feed(&mut button, ButtonLevel::Down, 0, &mut events));
        assert_eq!(kinds(&events), [ClickKind::Down]);
        assert_eq!(button.level(), ButtonLevel::Down);
        assert!(button.is_active());
    }

    #[test]
    fn bounce_leaves_state_untouched() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        feed(&mut button, ButtonLevel::Down, 100, &mut events);
        let before = button.clone();

        assert!(!feed(&mut button, ButtonLevel::Up, 124, &mut events));
        assert_eq!(events.len(), 1);
        assert_eq!(button.current_level, before.current_level);
        assert_eq!(button.current_tick, before.current_tick);
        assert_eq!(button.last_confirmed_tick, before.last_confirmed_tick);

        // Exactly one debounce window later the sample is trusted
        assert!(feed(&mut button, ButtonLevel::Up, 125, &mut events));
        assert_eq!(kinds(&events), [ClickKind::Down, ClickKind::Up]);
    }

    #[test]
    fn release_counts_click() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        feed(&mut button, ButtonLevel::Down, 0, &mut events);
        feed(&mut button, ButtonLevel::Up, 60, &mut events);

        assert_eq!(button.click_count(), 1);
        assert!(button.is_active());
        // Up carries the held time and the count before the release
        assert_eq!(events[1].duration, Duration::from_millis(60));
        assert_eq!(events[1].click_count, 0);
    }

    #[test]
    fn first_release_without_press_is_not_a_click() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        feed(&mut button, ButtonLevel::Up, 1000, &mut events);

        assert_eq!(kinds(&events), [ClickKind::Up]);
        assert_eq!(button.click_count(), 0);
        assert!(!button.is_active());
    }

    #[test]
    fn long_press_start_not_repeated_by_same_level_sample() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        feed(&mut button, ButtonLevel::Down, 0, &mut events);
        wake(&mut button, 800, &mut events);
        assert_eq!(kinds(&events), [ClickKind::Down, ClickKind::LongPressStart]);
        assert!(!button.is_active());

        // A lost release edge shows up as another Down sample
        feed(&mut button, ButtonLevel::Down, 900, &mut events);
        assert_eq!(kinds(&events), [ClickKind::Down, ClickKind::LongPressStart]);
        assert!(!button.is_active());
    }

    #[test]
    fn stale_sequence_resolved_past_long_press_gap() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        feed(&mut button, ButtonLevel::Down, 0, &mut events);
        feed(&mut button, ButtonLevel::Up, 50, &mut events);
        feed(&mut button, ButtonLevel::Down, 100, &mut events);
        feed(&mut button, ButtonLevel::Up, 150, &mut events);

        // The consumer overslept the click window
        wake(&mut button, 2000, &mut events);
        let last = events.last().copied().unwrap();
        assert_eq!(last.kind, ClickKind::MultiClick);
        assert_eq!(last.click_count, 2);
        assert_eq!(button.click_count(), 0);
        assert!(!button.is_active());
    }

    #[test]
    fn primed_up_is_idle() {
        let mut button = ButtonState::new(PIN, Tag(0));
        button.prime(ButtonLevel::Up, at(5));

        assert_eq!(button.level(), ButtonLevel::Up);
        assert!(!button.is_active());
    }

    #[test]
    fn primed_baseline_opens_no_debounce_window() {
        let mut button = ButtonState::new(PIN, Tag(0));
        let mut events = Vec::new();
        button.prime(ButtonLevel::Up, at(0));

        // Press right after boot, with bounce on both edges
        assert!(feed(&mut button, ButtonLevel::Down, 5, &mut events));
        assert!(!feed(&mut button, ButtonLevel::Up, 8, &mut events));
        assert!(!feed(&mut button, ButtonLevel::Down, 10, &mut events));
        assert!(feed(&mut button, ButtonLevel::Up, 70, &mut events));
        assert!(!feed(&mut button, ButtonLevel::Down, 73, &mut events));
        assert!(!feed(&mut button, ButtonLevel::Up, 75, &mut events));

        wake(&mut button, 400, &mut events);
        wake(&mut button, 2000, &mut events);
        assert_eq!(kinds(&events), [ClickKind::Down, ClickKind::Up, ClickKind::SingleClick]);
        assert_eq!(button.level(), ButtonLevel::Up);
        assert!(!button.is_active());
    }

    #[test]
    fn raw_level_conversions() {
        assert_eq!(RawLevel::from(true), RawLevel::High);
        assert_eq!(RawLevel::from(false), RawLevel::Low);
        assert_eq!(RawLevel::from(PinState::High), RawLevel::High);
        assert_eq!(RawLevel::from(PinState::Low), RawLevel::Low);
    }
}
