//! Loop playback scheduling.
//!
//! A [`PlaybackCursor`] replays one channel's recorded [`Take`] against the
//! tick clock, cycle after cycle while the channel is looped. Every emission
//! tick is computed from an absolute base as
//! `loop_start + cycle * length + offset`, so long runs never drift.

use std::sync::Arc;

use tracing::warn;

use crate::clock::Tick;
use crate::event::{EventKind, EventRecord};

/// A finished recording, as handed to the scheduler.
#[derive(Debug, Clone)]
pub struct Take {
    /// Events in recording order, offsets non-decreasing
    pub events: Arc<[EventRecord]>,
    /// Cycle length in ticks
    pub length_ticks: Tick,
}

impl Take {
    pub fn new(events: Vec<EventRecord>, length_ticks: Tick) -> Self {
        Self {
            events: events.into(),
            length_ticks,
        }
    }

    /// Nothing to schedule without events or without a cycle length.
    pub fn is_playable(&self) -> bool {
        !self.events.is_empty() && self.length_ticks > 0
    }
}

/// First multiple of `length` at or after `at`.
pub fn next_boundary(at: Tick, length: Tick) -> Tick {
    at.div_ceil(length) * length
}

/// Playback position of one channel.
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    take: Option<Take>,
    /// Tick at which cycle 0 of `take` starts
    loop_start_tick: Tick,
    cycle: u64,
    /// Index of next event to emit in the current cycle
    next_event_idx: usize,
    /// Notes turned on by playback and not yet turned off: (channel, key)
    sounding: Vec<(u8, u8)>,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `take` for the first cycle boundary at or after `at`.
    ///
    /// Returns false, leaving the cursor untouched, if the take has nothing to play.
    pub fn start(&mut self, take: Take, at: Tick) -> bool {
        if !take.is_playable() {
            return false;
        }
        self.loop_start_tick = next_boundary(at, take.length_ticks);
        self.cycle = 0;
        self.next_event_idx = 0;
        self.take = Some(take);
        true
    }

    /// Cancel everything not yet emitted.
    ///
    /// Returns the notes playback left sounding, which the caller must release.
    pub fn stop(&mut self) -> Vec<(u8, u8)> {
        self.take = None;
        self.cycle = 0;
        self.next_event_idx = 0;
        std::mem::take(&mut self.sounding)
    }

    pub fn is_armed(&self) -> bool {
        self.take.is_some()
    }

    /// Start tick of the cycle currently playing (or waiting to play).
    pub fn cycle_start_tick(&self) -> Option<Tick> {
        self.take
            .as_ref()
            .map(|take| self.loop_start_tick + self.cycle * take.length_ticks)
    }

    /// Notes left sounding by a pass that ended on its own.
    pub fn take_sounding(&mut self) -> Vec<(u8, u8)> {
        std::mem::take(&mut self.sounding)
    }

    /// Called on each timer callback. Returns events due at or before `now`, in order.
    ///
    /// When a cycle ends the cursor re-arms for the next one if `looped`,
    /// otherwise it disarms.
    pub fn tick(&mut self, now: Tick, looped: bool) -> Vec<EventRecord> {
        let mut due = Vec::new();

        while let Some(take) = self.take.clone() {
            let cycle_start = self.loop_start_tick + self.cycle * take.length_ticks;

            // A cycle that is already over before any of it was emitted is dropped whole
            if self.next_event_idx == 0 && now > cycle_start + take.length_ticks {
                if !looped {
                    warn!(
                        dropped_events = take.events.len(),
                        "Playback fell behind, dropping the whole pass."
                    );
                    self.take = None;
                    break;
                }
                self.skip_missed_cycles(now);
                continue;
            }

            while let Some(event) = take.events.get(self.next_event_idx) {
                if cycle_start + event.tick_offset > now {
                    return due;
                }
                track_sounding(&mut self.sounding, event);
                due.push(*event);
                self.next_event_idx += 1;
            }

            let cycle_end = cycle_start + take.length_ticks;
            if now < cycle_end {
                break;
            }
            if !looped {
                self.take = None;
                break;
            }
            self.cycle += 1;
            self.next_event_idx = 0;
            self.skip_missed_cycles(now);
        }

        due
    }

    /// Drop whole cycles the timer slept through instead of replaying them late.
    fn skip_missed_cycles(&mut self, now: Tick) {
        let Some(take) = self.take.as_ref() else {
            return;
        };
        let length = take.length_ticks;
        let cycle_start = self.loop_start_tick + self.cycle * length;
        if now < cycle_start + length {
            return;
        }

        let missed = (now - cycle_start) / length;
        self.cycle += missed;
        let cycle_start = cycle_start + missed * length;
        self.next_event_idx = take
            .events
            .partition_point(|event| cycle_start + event.tick_offset < now);
        warn!(
            missed_cycles = missed,
            dropped_events = self.next_event_idx,
            "Playback fell behind, dropping missed cycles."
        );
    }
}

fn track_sounding(sounding: &mut Vec<(u8, u8)>, event: &EventRecord) {
    let note = (event.channel, event.key);
    match event.kind {
        EventKind::NoteOn => {
            if !sounding.contains(&note) {
                sounding.push(note);
            }
        }
        EventKind::NoteOff => sounding.retain(|n| *n != note),
        _ => {}
    }
}
