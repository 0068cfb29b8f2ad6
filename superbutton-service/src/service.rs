//! Button service: registrations, dispatch channel and the published level table

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, DynamicSender};
use heapless::Vec;

use crate::button::ButtonLevel;
use crate::capture::{Capture, RawSample};
use crate::config::{Config, PullDirection, PullMode};
use crate::engine::Engine;
use crate::event::{ClickEvent, PinId, Tag};

/// Button indices travel as `u8` through the dispatch channel.
const MAX_BUTTONS: usize = u8::MAX as usize + 1;

/// Recommended dispatch channel capacity for `buttons` registered buttons.
///
/// Leaves room for a few bounces per button before the interrupt side has to drop samples.
pub const fn dispatch_capacity(buttons: usize) -> usize {
    5 * buttons
}

/// Service errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No buttons were registered
    NoButtons,
    /// More buttons than the service can hold
    TooManyButtons {
        /// Maximum number of buttons
        max: usize,
    },
    /// The same pin was registered twice
    DuplicatePin(PinId),
    /// Debounce window is zero
    ZeroDebounce,
    /// Multi-click gap is zero
    ZeroMultiClickGap,
    /// Long-press start gap is zero
    ZeroLongPressStartGap,
    /// Multi-click gap is not shorter than the long-press start gap
    GapOrder,
    /// Dispatch channel can't hold one sample per button
    DispatchTooSmall {
        /// Minimum capacity
        required: usize,
    },
    /// Pin is not registered with the service
    UnknownPin(PinId),
}

/// A button to monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registration {
    /// Input pin of the button
    pub pin: PinId,
    /// Context passed through to every event of this button
    pub tag: Tag,
}

impl Registration {
    /// Creates a new registration
    pub const fn new(pin: PinId, tag: Tag) -> Self {
        Self { pin, tag }
    }
}

/// Shared part of the button service.
///
/// `N` is the maximum number of buttons, `Q` the dispatch channel capacity
/// (see [`dispatch_capacity`]). Interrupt handlers push through [`Service::capture`],
/// the single consumer task runs the [`Engine`] returned by [`Service::engine`].
pub struct Service<M: RawMutex, const N: usize, const Q: usize> {
    config: Config,
    pull_mode: PullMode,
    pull_direction: PullDirection,
    buttons: Vec<Registration, N>,
    dispatch: Channel<M, RawSample, Q>,
    levels: Mutex<M, RefCell<[ButtonLevel; N]>>,
    engine_taken: Mutex<M, Cell<bool>>,
}

impl<M: RawMutex, const N: usize, const Q: usize> Service<M, N, Q> {
    /// Validates the registrations and configuration and creates the service.
    ///
    /// Buttons are indexed in registration order.
    pub fn new(
        buttons: &[Registration],
        pull_mode: PullMode,
        pull_direction: PullDirection,
        config: Config,
    ) -> Result<Self, Error> {
        if buttons.is_empty() {
            return Err(Error::NoButtons);
        }

        let max = N.min(MAX_BUTTONS);
        if buttons.len() > max {
            return Err(Error::TooManyButtons { max });
        }

        if Q < buttons.len() {
            return Err(Error::DispatchTooSmall {
                required: buttons.len(),
            });
        }

        for (i, button) in buttons.iter().enumerate() {
            if buttons[..i].iter().any(|other| other.pin == button.pin) {
                return Err(Error::DuplicatePin(button.pin));
            }
        }

        config.validate()?;

        let mut registered = Vec::new();
        registered
            .extend_from_slice(buttons)
            .map_err(|_| Error::TooManyButtons { max })?;

        info!(
            "Button service: {} buttons, pull {:?}/{:?}",
            registered.len(),
            pull_mode,
            pull_direction
        );

        Ok(Self {
            config,
            pull_mode,
            pull_direction,
            buttons: registered,
            dispatch: Channel::new(),
            levels: Mutex::new(RefCell::new([ButtonLevel::Undefined; N])),
            engine_taken: Mutex::new(Cell::new(false)),
        })
    }

    /// Timing configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pull resistor source
    pub fn pull_mode(&self) -> PullMode {
        self.pull_mode
    }

    /// Idle level of the inputs
    pub fn pull_direction(&self) -> PullDirection {
        self.pull_direction
    }

    /// Internal pull the platform layer has to enable on every button pin, if any.
    pub fn internal_pull(&self) -> Option<PullDirection> {
        self.pull_mode.internal_pull(self.pull_direction)
    }

    /// Registered buttons in index order
    pub fn buttons(&self) -> &[Registration] {
        &self.buttons
    }

    /// Registration index of `pin`, the value interrupt handlers pass to [`Capture`].
    pub fn index(&self, pin: PinId) -> Option<u8> {
        self.buttons
            .iter()
            .position(|button| button.pin == pin)
            .and_then(|index| u8::try_from(index).ok())
    }

    /// Handle for interrupt handlers to push raw samples.
    pub fn capture(&self) -> Capture<'_> {
        Capture::new(self.dispatch.dyn_sender())
    }

    /// Last classified level of `pin`, `None` if the pin is not registered.
    pub fn level(&self, pin: PinId) -> Option<ButtonLevel> {
        let index = usize::from(self.index(pin)?);
        Some(self.levels.lock(|levels| levels.borrow()[index]))
    }

    /// Creates the consumer engine delivering events to `events`.
    ///
    /// Returns `None` if an engine was already created for this service.
    pub fn engine<'e>(&self, events: DynamicSender<'e, ClickEvent>) -> Option<Engine<'_, 'e, M, N, Q>> {
        if self.engine_taken.lock(|taken| taken.replace(true)) {
            return None;
        }

        Some(Engine::new(self, events))
    }

    pub(crate) fn dispatch(&self) -> &Channel<M, RawSample, Q> {
        &self.dispatch
    }

    pub(crate) fn publish_level(&self, index: usize, level: ButtonLevel) {
        self.levels.lock(|levels| levels.borrow_mut()[index] = level);
    }
}
