//! Recorded MIDI events.
//!
//! An [`EventRecord`] is a plain value: one channel message plus the tick
//! offset from the start of the recording it belongs to. Live input carries
//! offset 0 until a recording channel stamps it.

use midly::live::LiveEvent;
use midly::MidiMessage;

use crate::clock::Tick;

/// The message kinds the looper understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteOn,
    NoteOff,
    ControlChange,
    ProgramChange,
    PitchBend,
}

impl EventKind {
    pub fn is_note(self) -> bool {
        matches!(self, EventKind::NoteOn | EventKind::NoteOff)
    }
}

/// A single MIDI occurrence.
///
/// Fields that don't apply to `kind` are zero. A note-on with velocity 0 is
/// stored as [`EventKind::NoteOff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub kind: EventKind,
    /// MIDI channel (0-15)
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    pub control: u8,
    pub value: u8,
    pub program: u8,
    /// Raw 14-bit pitch bend value, 8192 is centre
    pub pitch: u16,
    /// Ticks since the owning recording started
    pub tick_offset: Tick,
}

impl EventRecord {
    fn empty(kind: EventKind, channel: u8) -> Self {
        Self {
            kind,
            channel,
            key: 0,
            velocity: 0,
            control: 0,
            value: 0,
            program: 0,
            pitch: 0,
            tick_offset: 0,
        }
    }

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        if velocity == 0 {
            return Self::note_off(channel, key);
        }
        Self {
            key,
            velocity,
            ..Self::empty(EventKind::NoteOn, channel)
        }
    }

    pub fn note_off(channel: u8, key: u8) -> Self {
        Self {
            key,
            ..Self::empty(EventKind::NoteOff, channel)
        }
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self {
            control,
            value,
            ..Self::empty(EventKind::ControlChange, channel)
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self {
            program,
            ..Self::empty(EventKind::ProgramChange, channel)
        }
    }

    pub fn pitch_bend(channel: u8, pitch: u16) -> Self {
        Self {
            pitch,
            ..Self::empty(EventKind::PitchBend, channel)
        }
    }

    /// Copy of this event placed at `tick_offset`.
    pub fn with_tick_offset(self, tick_offset: Tick) -> Self {
        Self {
            tick_offset,
            ..self
        }
    }

    /// Parse raw MIDI bytes from an input port.
    ///
    /// Returns `None` for anything that isn't one of the supported channel
    /// messages (clock, sysex, aftertouch, malformed data).
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let LiveEvent::Midi { channel, message } = LiveEvent::parse(bytes).ok()? else {
            return None;
        };
        let channel = channel.as_int();

        let record = match message {
            MidiMessage::NoteOn { key, vel } => Self::note_on(channel, key.as_int(), vel.as_int()),
            MidiMessage::NoteOff { key, .. } => Self::note_off(channel, key.as_int()),
            MidiMessage::Controller { controller, value } => {
                Self::control_change(channel, controller.as_int(), value.as_int())
            }
            MidiMessage::ProgramChange { program } => {
                Self::program_change(channel, program.as_int())
            }
            MidiMessage::PitchBend { bend } => Self::pitch_bend(channel, bend.0.as_int()),
            MidiMessage::Aftertouch { .. } | MidiMessage::ChannelAftertouch { .. } => {
                return None
            }
        };
        Some(record)
    }
}
