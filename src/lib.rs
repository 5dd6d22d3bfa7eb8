//! Multi-channel MIDI loop recorder.
//!
//! Incoming MIDI is recorded into the active channel with tick offsets and
//! forwarded to a synth. Recorded channels play back on a sequencer timer,
//! once or looped, each on its own drift-free schedule.

pub mod channel;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod midi;
pub mod playback;
pub mod sequencer;
pub mod session;
pub mod synth;
pub mod ui;

pub use channel::{Channel, LoopLength};
pub use clock::{Clock, Tick};
pub use config::LooperConfig;
pub use engine::Engine;
pub use error::Error;
pub use event::{EventKind, EventRecord};
pub use synth::{ForwardPolicy, Synth};
