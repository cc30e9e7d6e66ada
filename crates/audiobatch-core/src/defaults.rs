//! Centralized default constants for audiobatch.
//!
//! All crates and the CLI reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// JOB DEFAULTS
// =============================================================================

/// Trim start assigned to newly queued jobs (`MM:SS`).
pub const JOB_START_TIME: &str = "00:00";

/// Trim end assigned to newly queued jobs (`MM:SS`).
pub const JOB_END_TIME: &str = "03:00";

/// Start time sent to the backend when a job has no start time set.
///
/// Note the `HH:MM:SS` shape, which differs from the `MM:SS` job fields.
pub const REQUEST_START_TIME: &str = "00:00:00";

/// End time sent to the backend when a job has no end time set.
pub const REQUEST_END_TIME: &str = "00:03:00";

/// Extension of the intermediate `output_filename` sent to the backend.
pub const INTERMEDIATE_EXTENSION: &str = "mp3";

// =============================================================================
// AUDIO
// =============================================================================

/// Default output bitrate.
pub const AUDIO_BITRATE: &str = "320k";

/// Default output sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: &str = "44100";

/// Default output channel count.
pub const AUDIO_CHANNELS: u32 = 2;

// =============================================================================
// PICKERS
// =============================================================================

/// Extensions offered by the source file picker.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov"];

/// Output formats a job can be converted to.
pub const AUDIO_FORMATS: &[&str] = &["mp3", "aac", "wav", "flac"];

// =============================================================================
// BACKEND
// =============================================================================

/// Default ffmpeg executable (resolved through `PATH`).
pub const FFMPEG_PATH: &str = "ffmpeg";

/// Upper bound for a single conversion in seconds.
pub const CONVERT_TIMEOUT_SECS: u64 = 600;

/// Lines of ffmpeg stderr kept in a failure message.
pub const STDERR_TAIL_LINES: usize = 8;

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;
