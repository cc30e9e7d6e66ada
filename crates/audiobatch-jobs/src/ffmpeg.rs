//! ffmpeg-backed conversion.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use audiobatch_core::defaults::{CONVERT_TIMEOUT_SECS, FFMPEG_PATH, STDERR_TAIL_LINES};
use audiobatch_core::{ConversionRequest, Error, OutputFormat, Result};

use crate::backend::ConversionBackend;

/// Settings for [`FfmpegBackend`].
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// ffmpeg executable, either a bare name looked up on `PATH` or a path.
    pub ffmpeg_path: String,
    /// Upper bound for a single conversion in seconds.
    pub timeout_secs: u64,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: FFMPEG_PATH.to_string(),
            timeout_secs: CONVERT_TIMEOUT_SECS,
        }
    }
}

impl FfmpegConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FFMPEG_PATH` | `ffmpeg` | ffmpeg executable |
    /// | `FFMPEG_TIMEOUT_SECS` | `600` | Per-conversion timeout |
    pub fn from_env() -> Self {
        let ffmpeg_path = std::env::var("FFMPEG_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| FFMPEG_PATH.to_string());

        let timeout_secs = std::env::var("FFMPEG_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(CONVERT_TIMEOUT_SECS)
            .max(1);

        Self {
            ffmpeg_path,
            timeout_secs,
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Encoder passed to `-acodec` for each output format.
pub fn codec_for(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Mp3 => "libmp3lame",
        OutputFormat::Aac => "aac",
        OutputFormat::Wav => "pcm_s16le",
        OutputFormat::Flac => "flac",
    }
}

/// Command-line arguments for one conversion.
///
/// The end time is passed with `-to`, so it is a position in the source, not
/// a duration.
pub fn build_args(request: &ConversionRequest) -> Vec<String> {
    let audio = &request.audio_config;
    let mut args: Vec<String> = vec![
        "-v".into(),
        "info".into(),
        "-i".into(),
        request.video_file.clone(),
    ];

    if !request.start_time.is_empty() {
        args.push("-ss".into());
        args.push(request.start_time.clone());
    }
    if !request.end_time.is_empty() {
        args.push("-to".into());
        args.push(request.end_time.clone());
    }

    args.extend([
        "-vn".into(),
        "-metadata".into(),
        format!("title={}", request.title),
        "-metadata".into(),
        format!("artist={}", request.artist),
        "-acodec".into(),
        codec_for(audio.format).into(),
        "-ab".into(),
        audio.bitrate.clone(),
        "-ar".into(),
        audio.sample_rate.clone(),
        "-ac".into(),
        audio.channels.to_string(),
        "-y".into(),
        request.output_path.clone(),
    ]);

    args
}

/// Last few lines of ffmpeg's stderr, which hold the actual error.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Converts by running the ffmpeg executable.
pub struct FfmpegBackend {
    config: FfmpegConfig,
}

impl FfmpegBackend {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(FfmpegConfig::from_env())
    }

    /// Fail early with a readable reason before spawning ffmpeg.
    fn check_paths(request: &ConversionRequest) -> Result<()> {
        if !Path::new(&request.video_file).exists() {
            return Err(Error::Backend(format!(
                "input file does not exist: {}",
                request.video_file
            )));
        }

        if let Some(parent) = Path::new(&request.output_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(Error::Backend(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ConversionBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<bool> {
        Self::check_paths(request)?;

        let args = build_args(request);
        debug!(ffmpeg = %self.config.ffmpeg_path, ?args, "Running ffmpeg");

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(&args).kill_on_drop(true);

        let start = Instant::now();
        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            cmd.output(),
        )
        .await
        .map_err(|_| {
            Error::Backend(format!(
                "ffmpeg timed out after {}s",
                self.config.timeout_secs
            ))
        })?
        .map_err(|e| {
            Error::Backend(format!(
                "failed to execute {}: {}",
                self.config.ffmpeg_path, e
            ))
        })?;

        if !output.status.success() {
            return Err(Error::Backend(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        info!(
            output_path = %request.output_path,
            duration_ms = start.elapsed().as_millis() as u64,
            "ffmpeg conversion finished"
        );
        Ok(true)
    }

    async fn health_check(&self) -> Result<bool> {
        let ok = match Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
        {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiobatch_core::{BatchConfig, ClipTime, ConversionJob};

    fn request_for(source: &str, config: &BatchConfig) -> ConversionRequest {
        let mut job = ConversionJob::new(source);
        job.title = "Song".to_string();
        job.artist = "Band".to_string();
        ConversionRequest::for_job(&job, config)
    }

    #[test]
    fn test_codec_for_each_format() {
        assert_eq!(codec_for(OutputFormat::Mp3), "libmp3lame");
        assert_eq!(codec_for(OutputFormat::Aac), "aac");
        assert_eq!(codec_for(OutputFormat::Wav), "pcm_s16le");
        assert_eq!(codec_for(OutputFormat::Flac), "flac");
    }

    #[test]
    fn test_build_args() {
        let mut job = ConversionJob::new("/v/in.mp4");
        job.title = "Song".to_string();
        job.artist = "Band".to_string();
        job.start_time = ClipTime::parse("0:15");
        job.output_format = OutputFormat::Flac;
        let config = BatchConfig::default().with_output_directory("/out");
        let args = build_args(&ConversionRequest::for_job(&job, &config));

        let expected: Vec<String> = [
            "-v", "info", "-i", "/v/in.mp4", "-ss", "00:15", "-to", "03:00", "-vn",
            "-metadata", "title=Song", "-metadata", "artist=Band", "-acodec", "flac", "-ab",
            "320k", "-ar", "44100", "-ac", "2", "-y", "/out/Song.flac",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {}\n\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 19"));
    }

    #[test]
    fn test_ffmpeg_config_builder() {
        let config = FfmpegConfig::default()
            .with_ffmpeg_path("/opt/ffmpeg")
            .with_timeout_secs(30);
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(FfmpegConfig::default().ffmpeg_path, "ffmpeg");
    }

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let backend = FfmpegBackend::new(FfmpegConfig::default());
        let request = request_for("/definitely/not/here.mp4", &BatchConfig::default());

        let err = backend.convert(&request).await.unwrap_err();
        assert!(err.to_string().contains("input file does not exist"));
    }

    #[tokio::test]
    async fn test_missing_output_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"not really a video").unwrap();

        let backend = FfmpegBackend::new(FfmpegConfig::default());
        let config = BatchConfig::default().with_output_directory(
            dir.path().join("missing").to_string_lossy().into_owned(),
        );
        let request = request_for(&source.to_string_lossy(), &config);

        let err = backend.convert(&request).await.unwrap_err();
        assert!(err.to_string().contains("output directory does not exist"));
    }

    #[tokio::test]
    async fn test_unspawnable_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"x").unwrap();

        let backend = FfmpegBackend::new(
            FfmpegConfig::default().with_ffmpeg_path("/nonexistent/bin/ffmpeg-audiobatch"),
        );
        let request = request_for(&source.to_string_lossy(), &BatchConfig::default());

        let err = backend.convert(&request).await.unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
        assert!(!backend.health_check().await.unwrap());
    }
}
