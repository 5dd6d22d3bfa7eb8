//! Configuration for the MIDI looper.
//!
//! Loads looper configuration from a YAML file. Every key is optional.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::LoopLength;
use crate::error::Error;
use crate::synth::ForwardPolicy;

/// MIDI has 16 channels, so that's the most the table can route to.
pub const MAX_CHANNELS: usize = 16;

/// Complete looper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    /// Substring of the MIDI input port name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Substring of the MIDI output port name (the synth)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    /// Number of channels in the table
    pub channels: usize,
    /// Sequencer time scale
    pub ticks_per_second: u32,
    /// Period of the sequencer callback
    pub timer_interval_ms: u64,
    /// Which event kinds reach the synth
    pub forward: ForwardPolicy,
    /// How stopping a recording fixes the loop length
    pub loop_length: LoopLength,
    /// Initial display names, keyed by channel index (0-based)
    pub channel_names: BTreeMap<usize, String>,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            channels: 10,
            ticks_per_second: 1000,
            timer_interval_ms: 1,
            forward: ForwardPolicy::default(),
            loop_length: LoopLength::default(),
            channel_names: BTreeMap::new(),
        }
    }
}

impl LooperConfig {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        let project_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        project_dir.join("looper_config.yaml")
    }

    /// Load configuration from a YAML file. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        // An empty document deserializes to unit, not to an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::InvalidConfig(format!(
                "channels must be between 1 and {}, got {}",
                MAX_CHANNELS, self.channels
            )));
        }
        if self.ticks_per_second == 0 {
            return Err(Error::InvalidConfig(
                "ticks_per_second must be greater than zero".to_string(),
            ));
        }
        if self.timer_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "timer_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(index) = self.channel_names.keys().find(|i| **i >= self.channels) {
            return Err(Error::InvalidConfig(format!(
                "channel_names has index {} but there are only {} channels",
                index, self.channels
            )));
        }
        Ok(())
    }

    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }

    /// Display name for a channel: configured, or its 1-based number.
    pub fn channel_name(&self, index: usize) -> String {
        self.channel_names
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("Channel {}", index + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LooperConfig::default();
        assert_eq!(config.channels, 10);
        assert_eq!(config.ticks_per_second, 1000);
        assert_eq!(config.timer_interval(), Duration::from_millis(1));
        assert_eq!(config.forward, ForwardPolicy::Notes);
        assert_eq!(config.loop_length, LoopLength::LastEvent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = LooperConfig::from_yaml(
            "output_device: FluidSynth\nforward: all\nchannel_names:\n  0: Drums\n",
        )
        .unwrap();
        assert_eq!(config.output_device.as_deref(), Some("FluidSynth"));
        assert_eq!(config.forward, ForwardPolicy::All);
        assert_eq!(config.channels, 10);
        assert_eq!(config.channel_name(0), "Drums");
        assert_eq!(config.channel_name(1), "Channel 2");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = LooperConfig::from_yaml("").unwrap();
        assert_eq!(config.channels, 10);
    }

    #[test]
    fn test_loop_length_mode() {
        let config = LooperConfig::from_yaml("loop_length: stop_tick").unwrap();
        assert_eq!(config.loop_length, LoopLength::StopTick);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            LooperConfig::from_yaml("channels: 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LooperConfig::from_yaml("channels: 17"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LooperConfig::from_yaml("ticks_per_second: 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LooperConfig::from_yaml("timer_interval_ms: 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LooperConfig::from_yaml("channels: 2\nchannel_names:\n  5: Lead\n"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        assert!(matches!(
            LooperConfig::from_yaml("channels: [1, 2"),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            LooperConfig::from_yaml("forward: everything"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LooperConfig::load(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config.channels, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "channels: 4").unwrap();
        writeln!(file, "ticks_per_second: 960").unwrap();
        let config = LooperConfig::load(file.path()).unwrap();
        assert_eq!(config.channels, 4);
        assert_eq!(config.ticks_per_second, 960);
    }
}
