//! Conversion backend abstraction.

use async_trait::async_trait;

use audiobatch_core::{ConversionRequest, Result};

/// Something that turns a source file into an audio file.
///
/// `Ok(true)` means the output was written. `Ok(false)` and `Err(_)` both
/// mark the job as failed; an error carries the reason shown to the user.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Perform one conversion.
    async fn convert(&self, request: &ConversionRequest) -> Result<bool>;

    /// Check that the backend is usable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Backend that accepts every request without doing any work.
///
/// Used for dry runs.
pub struct NoOpBackend;

#[async_trait]
impl ConversionBackend for NoOpBackend {
    fn name(&self) -> &str {
        "noop"
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<bool> {
        tracing::debug!(
            video_file = %request.video_file,
            output_path = %request.output_path,
            "Dry run conversion"
        );
        Ok(true)
    }
}
