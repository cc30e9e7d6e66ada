//! Sequential batch runner.
//!
//! A batch is the selected `Pending` jobs in queue order. They are validated
//! together and then converted one at a time: the backend call for one job
//! finishes before the next job starts. A failure only affects its own job.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use audiobatch_core::{
    BatchConfig, ConversionJob, ConversionRequest, Error, JobStatus, QueueEvent, Result,
};

use crate::backend::ConversionBackend;
use crate::store::JobStore;

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Eligible jobs when the batch started.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs that were no longer `Pending` (or no longer queued) when reached.
    pub skipped: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// What happened to a single job of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobOutcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Selected `Pending` jobs in queue order.
pub fn select_eligible(jobs: &[ConversionJob], selection: &HashSet<Uuid>) -> Vec<ConversionJob> {
    jobs.iter()
        .filter(|job| job.status == JobStatus::Pending && selection.contains(&job.id))
        .cloned()
        .collect()
}

/// Check that every job has a title and an artist.
///
/// Fails on the first job missing either, naming it by display name.
pub fn validate(jobs: &[ConversionJob]) -> Result<()> {
    match jobs.iter().find(|job| !job.has_required_metadata()) {
        Some(job) => Err(Error::Validation {
            display_name: job.display_name.clone(),
        }),
        None => Ok(()),
    }
}

/// User-facing message for a failed conversion.
fn failure_message(reason: Option<String>) -> String {
    match reason.filter(|r| !r.trim().is_empty()) {
        Some(reason) => format!("Conversion failed: {}", reason),
        None => "Conversion failed: unknown error".to_string(),
    }
}

/// Runs batches of queued jobs against a conversion backend.
pub struct BatchOrchestrator {
    store: JobStore,
    backend: Arc<dyn ConversionBackend>,
    /// Held for a whole batch so overlapping runs never reach the backend
    /// concurrently.
    run_lock: Mutex<()>,
}

impl BatchOrchestrator {
    pub fn new(store: JobStore, backend: Arc<dyn ConversionBackend>) -> Self {
        Self {
            store,
            backend,
            run_lock: Mutex::new(()),
        }
    }

    /// Convert the selected `Pending` jobs.
    ///
    /// Nothing is started if the selection is empty or any eligible job lacks
    /// a title or artist. Otherwise every eligible job is converted in queue
    /// order, one at a time. No cancellation: the batch runs to the end.
    #[instrument(skip(self, selection, config), fields(selected = selection.len()))]
    pub async fn run_batch(
        &self,
        selection: &HashSet<Uuid>,
        config: &BatchConfig,
    ) -> Result<BatchSummary> {
        if selection.is_empty() {
            return Err(Error::EmptySelection);
        }

        let _guard = self.run_lock.lock().await;

        let jobs = self.store.snapshot().await;
        let eligible = select_eligible(&jobs, selection);
        if let Err(e) = validate(&eligible) {
            warn!(error = %e, "Batch blocked by validation");
            return Err(e);
        }

        let mut summary = BatchSummary {
            attempted: eligible.len(),
            ..Default::default()
        };

        info!(batch_size = eligible.len(), backend = self.backend.name(), "Batch started");
        self.store.events().emit(QueueEvent::BatchStarted {
            batch_size: eligible.len(),
        });

        for job in &eligible {
            match self.run_job(job.id, config).await {
                JobOutcome::Succeeded => summary.succeeded += 1,
                JobOutcome::Failed => summary.failed += 1,
                JobOutcome::Skipped => summary.skipped += 1,
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch finished"
        );
        self.store.events().emit(QueueEvent::BatchFinished {
            succeeded: summary.succeeded,
            failed: summary.failed,
            skipped: summary.skipped,
        });

        Ok(summary)
    }

    /// Convert one job, re-reading its live state first.
    async fn run_job(&self, job_id: Uuid, config: &BatchConfig) -> JobOutcome {
        // The job may have been edited, removed, or started elsewhere since
        // the batch was selected.
        let Some(job) = self.store.try_begin_conversion(job_id).await else {
            debug!(%job_id, "Skipping job that is no longer pending");
            return JobOutcome::Skipped;
        };

        let request = ConversionRequest::for_job(&job, config);
        let start = Instant::now();
        info!(
            %job_id,
            display_name = %job.display_name,
            format = %job.output_format,
            output_path = %request.output_path,
            "Converting job"
        );

        let (succeeded, reason) = match self.backend.convert(&request).await {
            Ok(true) => (true, None),
            Ok(false) => (false, None),
            Err(Error::Backend(reason)) => (false, Some(reason)),
            Err(e) => (false, Some(e.to_string())),
        };

        let recorded = self.store.finish_conversion(job_id, succeeded).await;
        if !recorded {
            debug!(%job_id, "Converted job was removed from the queue");
        }

        if succeeded {
            info!(
                %job_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job converted"
            );
            JobOutcome::Succeeded
        } else {
            let message = failure_message(reason);
            warn!(
                %job_id,
                display_name = %job.display_name,
                error = %message,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job failed"
            );
            self.store.events().emit(QueueEvent::ConversionFailed {
                job_id,
                display_name: job.display_name.clone(),
                message,
            });
            JobOutcome::Failed
        }
    }
}
