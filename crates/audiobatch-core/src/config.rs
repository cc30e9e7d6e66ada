//! Process-wide batch configuration.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Output settings shared by every job in a run.
///
/// Owned by the presentation layer and passed by reference into each batch;
/// the orchestrator never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory for converted files. When unset each file is written next
    /// to its source.
    pub output_directory: Option<String>,
    pub audio_bitrate: String,
    pub sample_rate: String,
    pub channels: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            audio_bitrate: defaults::AUDIO_BITRATE.to_string(),
            sample_rate: defaults::AUDIO_SAMPLE_RATE.to_string(),
            channels: defaults::AUDIO_CHANNELS,
        }
    }
}

impl BatchConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AUDIOBATCH_OUTPUT_DIR` | unset | Output directory |
    /// | `AUDIOBATCH_BITRATE` | `320k` | Audio bitrate |
    /// | `AUDIOBATCH_SAMPLE_RATE` | `44100` | Sample rate in Hz |
    /// | `AUDIOBATCH_CHANNELS` | `2` | Channel count |
    ///
    /// Blank values fall back to the default. A channel count that is not a
    /// positive integer is an [`Error::Config`].
    pub fn from_env() -> Result<Self> {
        let output_directory = std::env::var("AUDIOBATCH_OUTPUT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let audio_bitrate = std::env::var("AUDIOBATCH_BITRATE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::AUDIO_BITRATE.to_string());

        let sample_rate = std::env::var("AUDIOBATCH_SAMPLE_RATE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::AUDIO_SAMPLE_RATE.to_string());

        let channels = parse_channels(std::env::var("AUDIOBATCH_CHANNELS").ok().as_deref())?;

        Ok(Self {
            output_directory,
            audio_bitrate,
            sample_rate,
            channels,
        })
    }

    /// Set the output directory (from the directory picker).
    pub fn with_output_directory(mut self, dir: impl Into<String>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Clear the output directory so files land next to their sources.
    pub fn without_output_directory(mut self) -> Self {
        self.output_directory = None;
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.audio_bitrate = bitrate.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: impl Into<String>) -> Self {
        self.sample_rate = sample_rate.into();
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }
}

fn parse_channels(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(defaults::AUDIO_CHANNELS);
    };
    match raw.parse::<u32>() {
        Ok(channels) if channels > 0 => Ok(channels),
        _ => Err(Error::Config(format!(
            "AUDIOBATCH_CHANNELS must be a positive integer, got {:?}",
            raw
        ))),
    }
}
