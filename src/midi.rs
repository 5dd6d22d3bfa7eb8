//! MIDI port I/O.
//!
//! The input side hands raw messages from the driver thread to a callback.
//! The output side is the looper's synthesis backend: a [`Synth`] that writes
//! channel messages to a MIDI port (a software synth, IAC bus, hardware...).
//! Writes go through a queue to a worker thread so callers never block on
//! the port.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::synth::Synth;

/// Note Off status (high nibble)
pub const NOTE_OFF: u8 = 0x80;

/// Note On status (high nibble)
pub const NOTE_ON: u8 = 0x90;

/// Control Change status (high nibble)
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Program Change status (high nibble)
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Pitch Bend status (high nibble)
pub const PITCH_BEND: u8 = 0xE0;

/// Port name fragment preferred when no device is configured.
const PREFERRED_PORT: &str = "IAC";

/// Pick a port index from the available port names.
///
/// With `wanted`, the first name containing it. Otherwise an IAC Driver
/// port if there is one, else the first port.
fn select_port(
    names: &[String],
    direction: &'static str,
    wanted: Option<&str>,
) -> Result<usize, Error> {
    if names.is_empty() {
        return Err(Error::NoPorts(direction));
    }
    match wanted {
        Some(wanted) => names
            .iter()
            .position(|n| n.contains(wanted))
            .ok_or_else(|| Error::PortNotFound {
                direction,
                wanted: wanted.to_string(),
            }),
        None => Ok(names
            .iter()
            .position(|n| n.contains(PREFERRED_PORT))
            .unwrap_or(0)),
    }
}

fn find_port<T: MidiIO>(
    io: &T,
    direction: &'static str,
    wanted: Option<&str>,
) -> Result<(T::Port, String), Error> {
    let ports = io.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| io.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    debug!(direction, ports = ?names, "Available MIDI ports.");

    let idx = select_port(&names, direction, wanted)?;
    Ok((ports[idx].clone(), names[idx].clone()))
}

/// Live MIDI input connection.
pub struct MidiIn {
    _connection: MidiInputConnection<()>,
    pub port_name: String,
}

impl MidiIn {
    /// Connect to an input port and call `on_message` with every raw message.
    ///
    /// The callback runs on the driver's thread.
    pub fn connect<F>(wanted: Option<&str>, mut on_message: F) -> Result<Self, Error>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let midi_in = MidiInput::new("looper-in").map_err(|source| Error::MidiInit {
            direction: "input",
            source,
        })?;
        let (port, port_name) = find_port(&midi_in, "input", wanted)?;

        let connection = midi_in
            .connect(
                &port,
                "looper-in",
                move |_timestamp, message, _| on_message(message),
                (),
            )
            .map_err(|e| Error::Connect {
                direction: "input",
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        info!(port = %port_name, "MIDI Input connected.");
        Ok(Self {
            _connection: connection,
            port_name,
        })
    }
}

/// Channel message bytes and how many of them are used.
type RawMessage = ([u8; 3], usize);

/// MIDI output used as the synthesis backend.
pub struct MidiOut {
    tx: Option<Sender<RawMessage>>,
    worker: Option<JoinHandle<()>>,
    pub port_name: String,
}

impl MidiOut {
    /// Connect to an output port, preferring IAC Driver when `wanted` is `None`.
    pub fn connect(wanted: Option<&str>) -> Result<Self, Error> {
        let midi_out = MidiOutput::new("looper-out").map_err(|source| Error::MidiInit {
            direction: "output",
            source,
        })?;
        let (port, port_name) = find_port(&midi_out, "output", wanted)?;

        let mut connection =
            midi_out
                .connect(&port, "looper-out")
                .map_err(|e| Error::Connect {
                    direction: "output",
                    port: port_name.clone(),
                    reason: e.to_string(),
                })?;

        let (tx, rx) = crossbeam_channel::unbounded::<RawMessage>();
        let worker = thread::Builder::new()
            .name("looper-midi-out".to_string())
            .spawn(move || {
                for (bytes, len) in rx {
                    if let Err(e) = connection.send(&bytes[..len]) {
                        warn!(err = %e, "Failed to send MIDI.");
                    }
                }
                connection.close();
            })
            .map_err(|source| Error::Spawn {
                name: "MIDI output",
                source,
            })?;

        info!(port = %port_name, "MIDI Output connected.");
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            port_name,
        })
    }

    fn send(&self, bytes: [u8; 3], len: usize) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if tx.send((bytes, len)).is_err() {
            warn!("MIDI output worker is gone, dropping message.");
        }
    }
}

impl Synth for MidiOut {
    fn note_on(&self, channel: u8, key: u8, velocity: u8) {
        self.send([NOTE_ON | (channel & 0x0F), key, velocity], 3);
    }

    fn note_off(&self, channel: u8, key: u8) {
        self.send([NOTE_OFF | (channel & 0x0F), key, 0], 3);
    }

    fn control_change(&self, channel: u8, control: u8, value: u8) {
        self.send([CONTROL_CHANGE | (channel & 0x0F), control, value], 3);
    }

    fn program_change(&self, channel: u8, program: u8) {
        self.send([PROGRAM_CHANGE | (channel & 0x0F), program, 0], 2);
    }

    fn pitch_bend(&self, channel: u8, value: u16) {
        self.send(
            [
                PITCH_BEND | (channel & 0x0F),
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ],
            3,
        );
    }
}

impl Drop for MidiOut {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain and exit
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(port = %self.port_name, "MIDI output worker panicked.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_ports_is_error() {
        assert!(matches!(
            select_port(&[], "input", None),
            Err(Error::NoPorts("input"))
        ));
    }

    #[test]
    fn test_prefers_iac_driver() {
        let ports = names(&["USB Keyboard", "IAC Driver Bus 1", "Other"]);
        assert_eq!(select_port(&ports, "output", None).unwrap(), 1);
    }

    #[test]
    fn test_falls_back_to_first_port() {
        let ports = names(&["USB Keyboard", "FluidSynth"]);
        assert_eq!(select_port(&ports, "output", None).unwrap(), 0);
    }

    #[test]
    fn test_wanted_port_by_substring() {
        let ports = names(&["IAC Driver Bus 1", "FLUID Synth (1234):Synth input port"]);
        assert_eq!(select_port(&ports, "output", Some("FLUID")).unwrap(), 1);
    }

    #[test]
    fn test_wanted_port_missing() {
        let ports = names(&["IAC Driver Bus 1"]);
        assert!(matches!(
            select_port(&ports, "input", Some("Launchpad")),
            Err(Error::PortNotFound { .. })
        ));
    }
}
