//! Channel registry and dispatch.
//!
//! The [`Engine`] owns the fixed table of channels, routes inbound MIDI to
//! the channel matching its MIDI channel number, and drives playback from
//! the sequencer's timer callback. It is built once at startup and shared by
//! reference (usually behind an `Arc`) with the input callback, the sequencer
//! thread and the GUI.

use parking_lot::Mutex;
use tracing::debug;

use crate::channel::{Channel, ChannelSlot, LoopLength};
use crate::clock::{Clock, Tick};
use crate::config::LooperConfig;
use crate::error::Error;
use crate::event::EventRecord;
use crate::synth::{forward, ForwardPolicy, Synth};

pub struct Engine {
    clock: Box<dyn Clock>,
    synth: Box<dyn Synth>,
    forward_policy: ForwardPolicy,
    loop_length: LoopLength,
    slots: Box<[ChannelSlot]>,
    /// Serializes changes to the active selection
    selection: Mutex<()>,
}

impl Engine {
    pub fn new(
        config: &LooperConfig,
        clock: Box<dyn Clock>,
        synth: Box<dyn Synth>,
    ) -> Result<Self, Error> {
        config.validate()?;
        if clock.ticks_per_second() == 0 {
            return Err(Error::InvalidConfig(
                "clock reports zero ticks per second".to_string(),
            ));
        }

        let slots = (0..config.channels)
            .map(|i| ChannelSlot::new(config.channel_name(i)))
            .collect();

        Ok(Self {
            clock,
            synth,
            forward_policy: config.forward,
            loop_length: config.loop_length,
            slots,
            selection: Mutex::new(()),
        })
    }

    pub fn channel_count(&self) -> usize {
        self.slots.len()
    }

    /// Handle to channel `number`.
    ///
    /// # Panics
    /// If `number` is outside the table.
    pub fn channel(&self, number: usize) -> Channel<'_> {
        assert!(
            number < self.slots.len(),
            "channel {} out of range (0..{})",
            number,
            self.slots.len()
        );
        Channel::new(self, number, &self.slots[number])
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel<'_>> {
        (0..self.slots.len()).map(move |i| Channel::new(self, i, &self.slots[i]))
    }

    /// Enable channel `number` and disable every other one.
    ///
    /// # Panics
    /// If `number` is outside the table.
    pub fn set_active_channel(&self, number: usize) {
        assert!(
            number < self.slots.len(),
            "channel {} out of range (0..{})",
            number,
            self.slots.len()
        );
        let _selection = self.selection.lock();
        for channel in self.channels() {
            channel.set_enabled(channel.number() == number);
        }
        debug!(channel = number, "Active channel selected.");
    }

    pub fn active_channel(&self) -> Option<usize> {
        let _selection = self.selection.lock();
        self.channels()
            .find(|channel| channel.is_enabled())
            .map(|channel| channel.number())
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.clock.ticks_per_second()
    }

    pub(crate) fn loop_length(&self) -> LoopLength {
        self.loop_length
    }

    pub(crate) fn synth(&self) -> &dyn Synth {
        self.synth.as_ref()
    }

    pub(crate) fn forward(&self, event: &EventRecord) {
        forward(self.synth.as_ref(), self.forward_policy, event);
    }

    /// Entry point for the MIDI input callback.
    pub fn on_midi_message(&self, message: &[u8]) {
        match EventRecord::parse(message) {
            Some(event) => self.on_event(event),
            None => debug!(message = ?message, "Ignoring unsupported MIDI message."),
        }
    }

    /// Route a live event to the channel matching its MIDI channel.
    ///
    /// Events on MIDI channels beyond the table are dropped.
    pub fn on_event(&self, event: EventRecord) {
        let number = event.channel as usize;
        if number >= self.slots.len() {
            debug!(
                channel = number,
                channels = self.slots.len(),
                "Dropping event for channel outside the table."
            );
            return;
        }
        self.channel(number).on_event(event);
    }

    /// Entry point for the sequencer's timer callback.
    pub fn on_timer(&self) {
        let now = self.clock.now();
        for channel in self.channels() {
            channel.poll_playback(now);
        }
    }
}
