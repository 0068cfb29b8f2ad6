//! Raw edge capture
//!
//! The producer side of the dispatch channel. `Capture::on_edge` is meant to
//! be called from a pin interrupt: it reads the tick, pushes one `RawSample`
//! without blocking and returns. A full channel drops the sample; the next
//! edge of the same button is debounced against the last confirmed change, so
//! a lost edge is corrected by the following one.
//!
//! Pushing into the channel wakes the engine's pending receive. On executors
//! with interrupt-priority scheduling the engine task is polled right after the
//! handler returns.

use core::convert::Infallible;

use embassy_sync::channel::DynamicSender;
use embassy_time::Instant;
use embedded_hal_1::digital::InputPin;
use embedded_hal_async::digital::Wait;

use crate::button::RawLevel;

/// One pin transition as seen by the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Registration index of the button
    pub index: u8,
    /// Level read right after the edge
    pub level: RawLevel,
    /// Tick at which the level was read
    pub tick: Instant,
}

/// Interrupt-side handle to the dispatch channel.
///
/// The channel must be built on an interrupt-safe raw mutex
/// (`CriticalSectionRawMutex`) when `on_edge` runs in interrupt context.
#[derive(Clone, Copy)]
pub struct Capture<'a> {
    sender: DynamicSender<'a, RawSample>,
}

impl<'a> Capture<'a> {
    pub(crate) fn new(sender: DynamicSender<'a, RawSample>) -> Self {
        Self { sender }
    }

    /// Enqueues a sample with an explicit tick. Returns `false` if the channel was full.
    pub fn on_edge_at(&self, index: u8, level: RawLevel, tick: Instant) -> bool {
        self.sender.try_send(RawSample { index, level, tick }).is_ok()
    }

    /// Enqueues a sample stamped with the current tick.
    pub fn on_edge(&self, index: u8, level: RawLevel) -> bool {
        self.on_edge_at(index, level, Instant::now())
    }

    /// Reads `pin` and enqueues its level for button `index`.
    ///
    /// A failed pin read is treated like a dropped sample.
    pub fn sample<P: InputPin>(&self, index: u8, pin: &mut P) -> bool {
        match pin.is_high() {
            Ok(is_high) => self.on_edge(index, RawLevel::from(is_high)),
            Err(_) => {
                warn!("Failed to read level of button {}", index);
                false
            }
        }
    }

    /// Samples `pin` after every edge it reports, for platforms where pin
    /// interrupts surface as `Wait` futures. Only returns if waiting fails.
    pub async fn watch<P: InputPin + Wait>(&self, index: u8, mut pin: P) -> Result<Infallible, P::Error> {
        loop {
            pin.wait_for_any_edge().await?;
            self.sample(index, &mut pin);
        }
    }
}
