//! Classification engine, the single consumer of the dispatch channel

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::DynamicSender;
use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;

use crate::button::{ButtonState, RawLevel};
use crate::capture::RawSample;
use crate::event::{ClickEvent, PinId};
use crate::service::{Error, Service};

/// Consumer task state: owns every [`ButtonState`] and turns raw samples into [`ClickEvent`]s.
pub struct Engine<'s, 'e, M: RawMutex, const N: usize, const Q: usize> {
    service: &'s Service<M, N, Q>,
    events: DynamicSender<'e, ClickEvent>,
    buttons: Vec<ButtonState, N>,
}

impl<'s, 'e, M: RawMutex, const N: usize, const Q: usize> Engine<'s, 'e, M, N, Q> {
    pub(crate) fn new(service: &'s Service<M, N, Q>, events: DynamicSender<'e, ClickEvent>) -> Self {
        // Registrations live in a Vec of the same capacity N, so this never overflows
        let buttons: Vec<ButtonState, N> = service
            .buttons()
            .iter()
            .map(|registration| ButtonState::new(registration.pin, registration.tag))
            .collect();
        debug_assert_eq!(buttons.len(), service.buttons().len());

        Self {
            service,
            events,
            buttons,
        }
    }

    /// Records the level `pin` had at boot as its confirmed baseline.
    ///
    /// Call before [`Engine::run`] with the level read during platform setup.
    /// A button held at boot reports `LongPressStart` once held for the long-press
    /// start gap after `tick`, without a preceding `Down`.
    pub fn prime(&mut self, pin: PinId, raw: RawLevel, tick: Instant) -> Result<(), Error> {
        let index = usize::from(self.service.index(pin).ok_or(Error::UnknownPin(pin))?);
        let level = self.service.pull_direction().logical(raw);

        self.buttons[index].prime(level, tick);
        self.service.publish_level(index, level);
        debug!("Pin {} primed {:?}", pin.0, level);
        Ok(())
    }

    /// State record of `pin`
    pub fn button(&self, pin: PinId) -> Option<&ButtonState> {
        self.buttons.iter().find(|button| button.pin() == pin)
    }

    /// How long the next receive may block: forever while no button is active,
    /// otherwise one multi-click gap so pending windows resolve without new edges.
    pub fn wake_timeout(&self) -> Option<Duration> {
        if self.buttons.iter().any(ButtonState::is_active) {
            Some(self.service.config().multi_click_gap)
        } else {
            None
        }
    }

    /// Runs the consumer loop forever.
    pub async fn run(&mut self) -> ! {
        info!("Button engine started with {} buttons", self.buttons.len());
        loop {
            self.process_next().await;
        }
    }

    /// Waits for the next sample or the wake timeout, then processes it.
    pub async fn process_next(&mut self) {
        let receive = self.service.dispatch().receive();
        let sample = match self.wake_timeout() {
            // A timeout is the trigger for time-driven resolution
            Some(timeout) => with_timeout(timeout, receive).await.ok(),
            None => Some(receive.await),
        };

        self.process(sample, Instant::now());
    }

    /// One engine iteration.
    ///
    /// A sample is debounced and, if accepted, its button is evaluated at the
    /// sample's tick. Every other active button is evaluated at `now`.
    ///
    /// While the dispatch channel holds a backlog, `now` runs ahead of the
    /// queued samples. A button whose release is still queued can then be
    /// classified at `now` first, e.g. as `LongPressStart`, and the release is
    /// applied when its sample is dequeued.
    ///
    /// # Panics
    ///
    /// Panics if the sample carries an index no button is registered at.
    pub fn process(&mut self, sample: Option<RawSample>, now: Instant) {
        let origin = match sample {
            Some(sample) => self.accept(sample),
            None => None,
        };

        if let Some((index, tick)) = origin {
            self.evaluate(index, tick);
        }

        for index in 0..self.buttons.len() {
            if origin.map(|(origin, _)| origin) == Some(index) || !self.buttons[index].is_active() {
                continue;
            }
            self.evaluate(index, now);
        }
    }

    fn accept(&mut self, sample: RawSample) -> Option<(usize, Instant)> {
        let index = usize::from(sample.index);
        let debounce = self.service.config().debounce;
        let level = self.service.pull_direction().logical(sample.level);

        let Some(button) = self.buttons.get_mut(index) else {
            panic!("Sample for unregistered button index {}", index);
        };

        if button.accept(level, sample.tick, debounce) {
            trace!(
                "Pin {} sample {:?} at {} ms",
                button.pin().0,
                level,
                sample.tick.as_millis()
            );
            Some((index, sample.tick))
        } else {
            debug!("Pin {} bounce at {} ms discarded", button.pin().0, sample.tick.as_millis());
            None
        }
    }

    fn evaluate(&mut self, index: usize, reference: Instant) {
        let config = *self.service.config();
        let events = self.events;
        let button = &mut self.buttons[index];

        button.evaluate(reference, &config, |event| {
            debug!(
                "Pin {} event {:?}, clicks {}, after {} ms",
                event.pin.0,
                event.kind,
                event.click_count,
                event.duration.as_millis()
            );
            if events.try_send(event).is_err() {
                warn!("Event channel full, dropping {:?} for pin {}", event.kind, event.pin.0);
            }
        });

        self.service.publish_level(index, button.level());
    }
}
