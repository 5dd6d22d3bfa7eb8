//! Error type for backend setup and configuration.
//!
//! The engine itself has no recoverable errors: no-op conditions are silent
//! and invariant violations panic. Everything here is a startup failure.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to create MIDI {direction}: {source}")]
    MidiInit {
        direction: &'static str,
        source: midir::InitError,
    },

    #[error("No MIDI {0} ports found")]
    NoPorts(&'static str),

    #[error("No MIDI {direction} port matching \"{wanted}\"")]
    PortNotFound {
        direction: &'static str,
        wanted: String,
    },

    #[error("Failed to connect MIDI {direction} to {port}: {reason}")]
    Connect {
        direction: &'static str,
        port: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config YAML: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn { name: &'static str, source: io::Error },
}
