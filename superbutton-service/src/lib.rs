//! Debounced click classification for interrupt-driven buttons
//!
//! Pin interrupts push raw samples through [`Capture`] into a bounded dispatch
//! channel. A single consumer task runs the [`Engine`], which debounces the
//! samples and turns them into [`ClickEvent`]s: press, release, single click,
//! multi-click, long-press start and long click.
//!
//! ```text
//! pin edge -> Capture (interrupt) -> dispatch channel -> Engine (task) -> event channel -> caller
//! ```
//!
//! Pin configuration, interrupt registration and task spawning stay with the
//! platform layer; [`Service::internal_pull`] tells it which pull to enable.

#![no_std]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod button;
pub mod capture;
pub mod config;
pub mod engine;
pub mod event;
pub mod service;

pub use button::{ButtonLevel, RawLevel};
pub use capture::{Capture, RawSample};
pub use config::{Config, PullDirection, PullMode};
pub use engine::Engine;
pub use event::{ClickEvent, ClickKind, PinId, Tag};
pub use service::{dispatch_capacity, Error, Registration, Service};
