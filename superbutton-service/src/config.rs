//! Timing thresholds and pull configuration

use embassy_time::Duration;

use crate::button::{ButtonLevel, RawLevel};
use crate::service::Error;

/// Timing thresholds used by the classification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Minimum time after a confirmed level change before a new sample is trusted.
    pub debounce: Duration,
    /// Idle time after which a pending click sequence is finalized.
    pub multi_click_gap: Duration,
    /// Held-down time that starts a long press.
    pub long_press_start_gap: Duration,
}

impl Config {
    /// Creates a configuration from millisecond values.
    pub const fn from_millis(debounce_ms: u64, multi_click_gap_ms: u64, long_press_start_gap_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            multi_click_gap: Duration::from_millis(multi_click_gap_ms),
            long_press_start_gap: Duration::from_millis(long_press_start_gap_ms),
        }
    }

    /// Checks that every threshold is positive and the click window ends before a long press starts.
    pub fn validate(&self) -> Result<(), Error> {
        if self.debounce.as_ticks() == 0 {
            return Err(Error::ZeroDebounce);
        }
        if self.multi_click_gap.as_ticks() == 0 {
            return Err(Error::ZeroMultiClickGap);
        }
        if self.long_press_start_gap.as_ticks() == 0 {
            return Err(Error::ZeroLongPressStartGap);
        }
        if self.multi_click_gap >= self.long_press_start_gap {
            return Err(Error::GapOrder);
        }

        Ok(())
    }
}

/// 25 ms debounce, 180 ms multi-click gap, 800 ms long-press start.
impl Default for Config {
    fn default() -> Self {
        Self::from_millis(25, 180, 800)
    }
}

/// Where the pull resistor of the button inputs comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PullMode {
    /// The chip's internal pull resistor is used.
    Chip,
    /// Resistors are fitted on the board; internal pulls stay disabled.
    Hardware,
}

impl PullMode {
    /// Returns the internal pull the platform layer has to enable, if any.
    pub fn internal_pull(self, direction: PullDirection) -> Option<PullDirection> {
        match self {
            PullMode::Chip => Some(direction),
            PullMode::Hardware => None,
        }
    }
}

/// Idle level of the button inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PullDirection {
    /// Inputs idle high, a press pulls them low.
    Up,
    /// Inputs idle low, a press drives them high.
    Down,
}

impl PullDirection {
    /// Maps an electrical level to the logical button level.
    pub fn logical(self, raw: RawLevel) -> ButtonLevel {
        match (self, raw) {
            (PullDirection::Up, RawLevel::Low) | (PullDirection::Down, RawLevel::High) => ButtonLevel::Down,
            (PullDirection::Up, RawLevel::High) | (PullDirection::Down, RawLevel::Low) => ButtonLevel::Up,
        }
    }
}
