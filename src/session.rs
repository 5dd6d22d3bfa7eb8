//! Startup wiring: backends, engine and sequencer.
//!
//! A [`Session`] owns everything with a thread or a port behind it. Dropping
//! it disconnects input first, then stops the sequencer, then releases the
//! engine (and with it the MIDI output).

use std::sync::Arc;

use tracing::info;

use crate::clock::TickClock;
use crate::config::LooperConfig;
use crate::engine::Engine;
use crate::error::Error;
use crate::midi::{MidiIn, MidiOut};
use crate::sequencer::Sequencer;

pub struct Session {
    input: MidiIn,
    _sequencer: Sequencer,
    output_port: String,
    engine: Arc<Engine>,
}

impl Session {
    /// Bring up the looper. Any backend failure is fatal to the caller.
    pub fn start(config: &LooperConfig) -> Result<Self, Error> {
        config.validate()?;

        let clock = TickClock::new(config.ticks_per_second)?;
        let synth = MidiOut::connect(config.output_device.as_deref())?;
        let output_port = synth.port_name.clone();
        let engine = Arc::new(Engine::new(config, Box::new(clock), Box::new(synth))?);

        let sequencer = {
            let engine = Arc::clone(&engine);
            Sequencer::spawn(config.timer_interval(), move || engine.on_timer())?
        };

        let input = {
            let engine = Arc::clone(&engine);
            MidiIn::connect(config.input_device.as_deref(), move |message| {
                engine.on_midi_message(message)
            })?
        };

        info!(
            input = %input.port_name,
            output = %output_port,
            channels = engine.channel_count(),
            ticks_per_second = engine.ticks_per_second(),
            "Looper running."
        );

        Ok(Self {
            input,
            _sequencer: sequencer,
            output_port,
            engine,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn input_port(&self) -> &str {
        &self.input.port_name
    }

    pub fn output_port(&self) -> &str {
        &self.output_port
    }
}
