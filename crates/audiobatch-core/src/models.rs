//! Job, status, and backend request types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::defaults;
use crate::paths;
use crate::time::ClipTime;

// =============================================================================
// STATUS
// =============================================================================

/// Lifecycle of a queued job.
///
/// `Pending -> Converting -> Done | Failed`; `Done | Failed -> Pending` only
/// when the user edits the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Converting,
    Done,
    Failed,
}

impl JobStatus {
    /// Human-readable label for list rendering.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Converting => "Converting",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    /// Whether the job finished a run (successfully or not).
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Converting => write!(f, "converting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// OUTPUT FORMAT
// =============================================================================

/// Audio container/codec a job is converted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    Aac,
    Wav,
    Flac,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Mp3, Self::Aac, Self::Wav, Self::Flac];

    /// File extension, also used as the wire value.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "aac",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "aac" => Ok(Self::Aac),
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

// =============================================================================
// JOB
// =============================================================================

/// User-editable job fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    StartTime,
    EndTime,
    Title,
    Artist,
    OutputFormat,
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTime => write!(f, "start_time"),
            Self::EndTime => write!(f, "end_time"),
            Self::Title => write!(f, "title"),
            Self::Artist => write!(f, "artist"),
            Self::OutputFormat => write!(f, "output_format"),
        }
    }
}

impl std::str::FromStr for JobField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start_time" | "startTime" => Ok(Self::StartTime),
            "end_time" | "endTime" => Ok(Self::EndTime),
            "title" => Ok(Self::Title),
            "artist" => Ok(Self::Artist),
            "output_format" | "outputFormat" => Ok(Self::OutputFormat),
            _ => Err(format!("Invalid job field: {}", s)),
        }
    }
}

/// One queued file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: Uuid,
    pub source_path: String,
    /// Final segment of `source_path`, fixed at creation.
    pub display_name: String,
    /// `None` means unset; the request falls back to `00:00:00`.
    pub start_time: Option<ClipTime>,
    /// `None` means unset; the request falls back to `00:03:00`.
    pub end_time: Option<ClipTime>,
    pub title: String,
    pub artist: String,
    pub output_format: OutputFormat,
    pub status: JobStatus,
}

impl ConversionJob {
    /// Create a pending job for a source file.
    ///
    /// The title defaults to the file name without its extension.
    pub fn new(source_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let display_name = paths::file_name(&source_path).to_string();
        let title = paths::file_stem(&display_name).to_string();

        Self {
            id: Uuid::now_v7(),
            source_path,
            display_name,
            start_time: ClipTime::parse(defaults::JOB_START_TIME),
            end_time: ClipTime::parse(defaults::JOB_END_TIME),
            title,
            artist: String::new(),
            output_format: OutputFormat::default(),
            status: JobStatus::Pending,
        }
    }

    /// Whether title and artist are both non-blank.
    pub fn has_required_metadata(&self) -> bool {
        !self.title.trim().is_empty() && !self.artist.trim().is_empty()
    }

    /// Where the converted file is written.
    ///
    /// With an output directory: `{dir}/{title}.{format}`, where separators in
    /// the title become `_` so the file always lands directly in `dir`.
    /// Otherwise the source path with its extension swapped for the output
    /// format.
    pub fn output_path(&self, config: &BatchConfig) -> String {
        let ext = self.output_format.extension();
        match config.output_directory.as_deref() {
            Some(dir) => {
                let name = format!("{}.{}", paths::sanitize_segment(&self.title), ext);
                paths::join(dir, &name)
            }
            None => paths::replace_extension(&self.source_path, ext),
        }
    }
}

// =============================================================================
// BACKEND REQUEST
// =============================================================================

/// Output audio settings sent with each conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub format: OutputFormat,
    pub bitrate: String,
    pub sample_rate: String,
    pub channels: u32,
}

/// Payload handed to a conversion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub video_file: String,
    /// Source path with an `.mp3` extension; kept for backends that expect it.
    pub output_filename: String,
    pub output_path: String,
    pub title: String,
    pub artist: String,
    pub start_time: String,
    pub end_time: String,
    pub audio_config: AudioConfig,
}

impl ConversionRequest {
    /// Build the request for a job under the given batch configuration.
    pub fn for_job(job: &ConversionJob, config: &BatchConfig) -> Self {
        Self {
            video_file: job.source_path.clone(),
            output_filename: paths::replace_extension(
                &job.source_path,
                defaults::INTERMEDIATE_EXTENSION,
            ),
            output_path: job.output_path(config),
            title: job.title.clone(),
            artist: job.artist.clone(),
            start_time: job
                .start_time
                .as_ref()
                .map_or_else(|| defaults::REQUEST_START_TIME.to_string(), |t| t.to_string()),
            end_time: job
                .end_time
                .as_ref()
                .map_or_else(|| defaults::REQUEST_END_TIME.to_string(), |t| t.to_string()),
            audio_config: AudioConfig {
                format: job.output_format,
                bitrate: config.audio_bitrate.clone(),
                sample_rate: config.sample_rate.clone(),
                channels: config.channels,
            },
        }
    }
}
