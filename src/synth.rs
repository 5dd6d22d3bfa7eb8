//! Synthesis backend seam.
//!
//! Everything the engine wants to sound goes through a [`Synth`]. Calls are
//! fire-and-forget and must not block on I/O: the sequencer calls them while
//! holding a channel lock.

use serde::{Deserialize, Serialize};

use crate::event::{EventKind, EventRecord};

pub trait Synth: Send + Sync {
    fn note_on(&self, channel: u8, key: u8, velocity: u8);

    fn note_off(&self, channel: u8, key: u8);

    fn control_change(&self, _channel: u8, _control: u8, _value: u8) {}

    fn program_change(&self, _channel: u8, _program: u8) {}

    fn pitch_bend(&self, _channel: u8, _value: u16) {}
}

/// Which event kinds are passed on to the synth, for live input and playback alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardPolicy {
    /// Note-on and note-off only.
    #[default]
    Notes,
    /// Every supported kind.
    All,
}

impl ForwardPolicy {
    pub fn forwards(self, kind: EventKind) -> bool {
        match self {
            ForwardPolicy::Notes => kind.is_note(),
            ForwardPolicy::All => true,
        }
    }
}

/// Send `event` to `synth` if `policy` allows its kind.
pub fn forward(synth: &dyn Synth, policy: ForwardPolicy, event: &EventRecord) {
    if !policy.forwards(event.kind) {
        return;
    }
    match event.kind {
        EventKind::NoteOn => synth.note_on(event.channel, event.key, event.velocity),
        EventKind::NoteOff => synth.note_off(event.channel, event.key),
        EventKind::ControlChange => synth.control_change(event.channel, event.control, event.value),
        EventKind::ProgramChange => synth.program_change(event.channel, event.program),
        EventKind::PitchBend => synth.pitch_bend(event.channel, event.pitch),
    }
}

/// Synth that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSynth;

impl Synth for NullSynth {
    fn note_on(&self, _channel: u8, _key: u8, _velocity: u8) {}

    fn note_off(&self, _channel: u8, _key: u8) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::Synth;

    /// What a [`RecordingSynth`] was asked to play.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Played {
        NoteOn { channel: u8, key: u8, velocity: u8 },
        NoteOff { channel: u8, key: u8 },
        Control { channel: u8, control: u8, value: u8 },
        Program { channel: u8, program: u8 },
        Bend { channel: u8, value: u16 },
    }

    /// Synth double that logs every call. Clones share the log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSynth {
        played: Arc<Mutex<Vec<Played>>>,
    }

    impl RecordingSynth {
        pub fn played(&self) -> Vec<Played> {
            self.played.lock().clone()
        }

        pub fn clear(&self) {
            self.played.lock().clear();
        }
    }

    impl Synth for RecordingSynth {
        fn note_on(&self, channel: u8, key: u8, velocity: u8) {
            self.played.lock().push(Played::NoteOn {
                channel,
                key,
                velocity,
            });
        }

        fn note_off(&self, channel: u8, key: u8) {
            self.played.lock().push(Played::NoteOff { channel, key });
        }

        fn control_change(&self, channel: u8, control: u8, value: u8) {
            self.played.lock().push(Played::Control {
                channel,
                control,
                value,
            });
        }

        fn program_change(&self, channel: u8, program: u8) {
            self.played.lock().push(Played::Program { channel, program });
        }

        fn pitch_bend(&self, channel: u8, value: u16) {
            self.played.lock().push(Played::Bend { channel, value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Played, RecordingSynth};
    use super::*;

    #[test]
    fn test_notes_policy_drops_other_kinds() {
        let synth = RecordingSynth::default();
        forward(&synth, ForwardPolicy::Notes, &EventRecord::note_on(0, 60, 100));
        forward(&synth, ForwardPolicy::Notes, &EventRecord::control_change(0, 7, 100));
        forward(&synth, ForwardPolicy::Notes, &EventRecord::pitch_bend(0, 0));
        forward(&synth, ForwardPolicy::Notes, &EventRecord::note_off(0, 60));

        assert_eq!(
            synth.played(),
            vec![
                Played::NoteOn {
                    channel: 0,
                    key: 60,
                    velocity: 100
                },
                Played::NoteOff { channel: 0, key: 60 },
            ]
        );
    }

    #[test]
    fn test_all_policy_forwards_everything() {
        let synth = RecordingSynth::default();
        forward(&synth, ForwardPolicy::All, &EventRecord::control_change(1, 7, 90));
        forward(&synth, ForwardPolicy::All, &EventRecord::program_change(1, 5));
        forward(&synth, ForwardPolicy::All, &EventRecord::pitch_bend(1, 9000));

        assert_eq!(
            synth.played(),
            vec![
                Played::Control {
                    channel: 1,
                    control: 7,
                    value: 90
                },
                Played::Program {
                    channel: 1,
                    program: 5
                },
                Played::Bend {
                    channel: 1,
                    value: 9000
                },
            ]
        );
    }

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        let policy: ForwardPolicy = serde_yaml::from_str("all").unwrap();
        assert_eq!(policy, ForwardPolicy::All);
        assert_eq!(ForwardPolicy::default(), ForwardPolicy::Notes);
    }
}
