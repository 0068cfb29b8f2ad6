//! Classified button events delivered to the caller

use embassy_time::Duration;

/// Identifier of a monitored input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

/// Caller-supplied context attached to a button, passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tag(pub usize);

/// Classification of a button event. Exactly one kind per emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClickKind {
    /// Confirmed press.
    Down,
    /// Confirmed release.
    Up,
    /// One click, finalized after the multi-click gap.
    SingleClick,
    /// Several clicks within the multi-click gap, see `ClickEvent::click_count`.
    MultiClick,
    /// Press released after the long-press start gap.
    LongClick,
    /// Press held for the long-press start gap.
    LongPressStart,
}

/// A classified event for one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClickEvent {
    /// Pin the event belongs to
    pub pin: PinId,
    /// Context registered with the pin
    pub tag: Tag,
    /// Event classification
    pub kind: ClickKind,
    /// Clicks accumulated when the event was emitted
    pub click_count: u16,
    /// Time since the last confirmed level change
    pub duration: Duration,
}
