//! Per-channel recording and playback state.
//!
//! Each channel has four independent flags (recording, playing, looped,
//! enabled), a recording buffer and a loop length. A [`Channel`] is a cheap
//! handle pairing the owning [`Engine`] with a channel index.
//!
//! # Thread Safety
//! The buffer, the loop length, the `recording` and `playing` flags and the
//! playback cursor only change while the channel's lock is held. Live input,
//! the sequencer thread and control calls all take that lock, so an append
//! can never land in a buffer that a restart has just cleared, and stopping
//! playback cannot race an emission. Flags are mirrored in atomics so the
//! display can read them without locking.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::clock::{ticks_to_seconds, Tick};
use crate::engine::Engine;
use crate::event::EventRecord;
use crate::playback::{PlaybackCursor, Take};

/// How stopping a recording fixes the loop length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopLength {
    /// Tick offset of the last captured event.
    #[default]
    LastEvent,
    /// Ticks between starting and stopping the recording.
    StopTick,
}

struct ChannelState {
    name: String,
    recorded_events: Vec<EventRecord>,
    recording_started_at: Tick,
    recording_length_in_ticks: Tick,
    cursor: PlaybackCursor,
}

pub(crate) struct ChannelSlot {
    state: Mutex<ChannelState>,
    recording: AtomicBool,
    playing: AtomicBool,
    looped: AtomicBool,
    enabled: AtomicBool,
    event_count: AtomicUsize,
    length_ticks: AtomicU64,
}

impl ChannelSlot {
    pub(crate) fn new(name: String) -> Self {
        Self {
            state: Mutex::new(ChannelState {
                name,
                recorded_events: Vec::new(),
                recording_started_at: 0,
                recording_length_in_ticks: 0,
                cursor: PlaybackCursor::new(),
            }),
            recording: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            looped: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            event_count: AtomicUsize::new(0),
            length_ticks: AtomicU64::new(0),
        }
    }
}

/// Handle to one channel of an [`Engine`].
#[derive(Clone, Copy)]
pub struct Channel<'a> {
    engine: &'a Engine,
    number: usize,
    slot: &'a ChannelSlot,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(engine: &'a Engine, number: usize, slot: &'a ChannelSlot) -> Self {
        Self {
            engine,
            number,
            slot,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn name(&self) -> String {
        self.slot.state.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.slot.state.lock().name = name.into();
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    pub fn is_recorded(&self) -> bool {
        !self.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.slot.event_count.load(Ordering::Acquire)
    }

    /// Copy of the recording buffer.
    pub fn recorded_events(&self) -> Vec<EventRecord> {
        self.slot.state.lock().recorded_events.clone()
    }

    // ---- recording ----

    pub fn is_recording(&self) -> bool {
        self.slot.recording.load(Ordering::Acquire)
    }

    pub fn set_recording(&self, value: bool) {
        let mut state = self.slot.state.lock();
        if value {
            self.begin_recording(&mut state);
        } else {
            self.end_recording(&mut state, None);
        }
    }

    /// Start a fresh recording, discarding the previous one.
    pub fn start_recording(&self) {
        self.set_recording(true);
    }

    pub fn stop_recording(&self) {
        self.set_recording(false);
    }

    /// Stop recording with an externally chosen loop length (e.g. a bar boundary).
    ///
    /// The length is raised to the last event's offset if it is shorter.
    pub fn stop_recording_at(&self, length_ticks: Tick) {
        let mut state = self.slot.state.lock();
        self.end_recording(&mut state, Some(length_ticks));
    }

    pub fn toggle_recording(&self) {
        let mut state = self.slot.state.lock();
        if self.is_recording() {
            self.end_recording(&mut state, None);
        } else {
            self.begin_recording(&mut state);
        }
    }

    fn begin_recording(&self, state: &mut ChannelState) {
        if self.is_recording() {
            return;
        }
        if self.is_playing() {
            self.halt_playback(state);
        }

        state.recorded_events.clear();
        state.recording_length_in_ticks = 0;
        state.recording_started_at = self.engine.now();
        self.slot.event_count.store(0, Ordering::Release);
        self.slot.length_ticks.store(0, Ordering::Release);
        self.slot.recording.store(true, Ordering::Release);

        info!(
            channel = self.number,
            tick = state.recording_started_at,
            "Recording started."
        );
    }

    fn end_recording(&self, state: &mut ChannelState, length_ticks: Option<Tick>) {
        if !self.is_recording() {
            return;
        }
        self.slot.recording.store(false, Ordering::Release);

        let length = match state.recorded_events.last() {
            None => 0,
            Some(last) => match length_ticks {
                Some(length) => length.max(last.tick_offset),
                None => match self.engine.loop_length() {
                    LoopLength::LastEvent => last.tick_offset,
                    LoopLength::StopTick => self
                        .engine
                        .now()
                        .saturating_sub(state.recording_started_at)
                        .max(last.tick_offset),
                },
            },
        };
        state.recording_length_in_ticks = length;
        self.slot.length_ticks.store(length, Ordering::Release);

        info!(
            channel = self.number,
            events = state.recorded_events.len(),
            length_ticks = length,
            "Recording stopped."
        );
    }

    // ---- playback ----

    pub fn is_playing(&self) -> bool {
        self.slot.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, value: bool) {
        let mut state = self.slot.state.lock();
        if value {
            self.begin_playback(&mut state);
        } else {
            self.halt_playback(&mut state);
        }
    }

    /// Start playback at the next loop boundary. A no-op for an unrecorded channel.
    pub fn start_playing(&self) {
        self.set_playing(true);
    }

    /// Stop playback. Nothing scheduled for this channel fires after this returns.
    pub fn stop_playing(&self) {
        self.set_playing(false);
    }

    pub fn toggle_playing(&self) {
        let mut state = self.slot.state.lock();
        if self.is_playing() {
            self.halt_playback(&mut state);
        } else {
            self.begin_playback(&mut state);
        }
    }

    fn begin_playback(&self, state: &mut ChannelState) {
        if self.is_playing() {
            return;
        }
        if self.is_recording() {
            debug!(channel = self.number, "Still recording, not starting playback.");
            return;
        }

        let take = Take::new(
            state.recorded_events.clone(),
            state.recording_length_in_ticks,
        );
        let now = self.engine.now();
        if !state.cursor.start(take, now) {
            debug!(channel = self.number, "Nothing recorded, not starting playback.");
            return;
        }
        self.slot.playing.store(true, Ordering::Release);

        info!(
            channel = self.number,
            at = ?state.cursor.cycle_start_tick(),
            looped = self.is_looped(),
            "Playback armed."
        );
    }

    fn halt_playback(&self, state: &mut ChannelState) {
        let sounding = state.cursor.stop();
        self.release(&sounding);
        if self.slot.playing.swap(false, Ordering::AcqRel) {
            info!(channel = self.number, "Playback stopped.");
        }
    }

    /// Emit whatever playback has due at `now`. Driven by the sequencer.
    pub(crate) fn poll_playback(&self, now: Tick) {
        if !self.is_playing() {
            return;
        }
        let mut state = self.slot.state.lock();
        if !self.is_playing() {
            return;
        }

        for event in state.cursor.tick(now, self.is_looped()) {
            self.engine.forward(&event);
        }

        if !state.cursor.is_armed() {
            let sounding = state.cursor.take_sounding();
            self.release(&sounding);
            self.slot.playing.store(false, Ordering::Release);
            info!(channel = self.number, "Playback finished.");
        }
    }

    fn release(&self, notes: &[(u8, u8)]) {
        for &(channel, key) in notes {
            self.engine.synth().note_off(channel, key);
        }
    }

    // ---- looping ----

    pub fn is_looped(&self) -> bool {
        self.slot.looped.load(Ordering::Acquire)
    }

    /// Takes effect at the next cycle boundary.
    pub fn set_looped(&self, value: bool) {
        self.slot.looped.store(value, Ordering::Release);
    }

    pub fn toggle_looped(&self) {
        self.slot.looped.fetch_xor(true, Ordering::AcqRel);
    }

    // ---- active selection ----

    pub fn is_enabled(&self) -> bool {
        self.slot.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, value: bool) {
        self.slot.enabled.store(value, Ordering::Release);
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    pub fn toggle_enabled(&self) {
        self.slot.enabled.fetch_xor(true, Ordering::AcqRel);
    }

    // ---- length ----

    pub fn recording_length_in_ticks(&self) -> Tick {
        self.slot.length_ticks.load(Ordering::Acquire)
    }

    pub fn recording_length_in_seconds(&self) -> f64 {
        ticks_to_seconds(
            self.recording_length_in_ticks(),
            self.engine.ticks_per_second(),
        )
    }

    /// Human readable flags in the order: playing, recording/recorded, enabled, looped.
    pub fn state_string(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.is_playing() {
            parts.push("playing");
        }
        if self.is_recording() {
            parts.push("recording");
        } else if self.is_recorded() {
            parts.push("recorded");
        }
        if self.is_enabled() {
            parts.push("enabled");
        }
        if self.is_looped() {
            parts.push("looped");
        }
        parts.join(" ")
    }

    /// Ingest one live event: record it if recording, then forward it to the synth.
    pub fn on_event(&self, event: EventRecord) {
        // Stamp on arrival, before taking the lock
        let now = self.engine.now();
        {
            let mut state = self.slot.state.lock();
            if self.is_recording() {
                let mut offset = now.saturating_sub(state.recording_started_at);
                // Offsets never decrease within a recording
                if let Some(last) = state.recorded_events.last() {
                    offset = offset.max(last.tick_offset);
                }
                state.recorded_events.push(event.with_tick_offset(offset));
                self.slot
                    .event_count
                    .store(state.recorded_events.len(), Ordering::Release);
            }
        }
        trace!(channel = self.number, event = ?event, "MIDI event.");
        self.engine.forward(&event);
    }
}

impl std::fmt::Debug for Channel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("number", &self.number)
            .field("state", &self.state_string())
            .field("length_ticks", &self.recording_length_in_ticks())
            .finish()
    }
}
