//! In-memory job queue.
//!
//! [`JobStore`] is the only owner of the ordered job list. User edits go
//! through [`JobStore::add_job`], [`JobStore::update_field`] and
//! [`JobStore::remove_jobs`]; status transitions into and out of
//! `Converting` are reserved for the orchestrator in this crate.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use audiobatch_core::{
    paths, ClipTime, ConversionJob, Error, EventBus, JobField, JobStatus, OutputFormat, QueueEvent,
    Result,
};

/// Result of a [`JobStore::update_field`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The value was stored.
    Applied,
    /// The value was stored and the finished job went back to `Pending`.
    Requeued,
    /// The value was malformed and the field kept its previous value.
    Rejected,
}

/// Shared handle to the ordered job queue.
///
/// Clones share the same queue and event bus.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<Vec<ConversionJob>>>,
    events: EventBus,
}

impl JobStore {
    /// Create an empty store publishing to `events`.
    pub fn new(events: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// The bus this store publishes on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Queue a source file.
    ///
    /// The path is not checked for existence; the backend reports missing
    /// files when the job runs.
    pub async fn add_job(&self, path: &str) -> Result<Uuid> {
        if path.trim().is_empty() {
            return Err(Error::InvalidInput("source path is empty".to_string()));
        }
        if paths::file_name(path).trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "source path has no file name: {}",
                path
            )));
        }

        let job = ConversionJob::new(path);
        let job_id = job.id;

        let mut jobs = self.jobs.write().await;
        info!(%job_id, display_name = %job.display_name, "Job queued");
        jobs.push(job);
        self.events.emit(QueueEvent::JobAdded {
            job_id,
            index: jobs.len() - 1,
        });
        Ok(job_id)
    }

    /// Queue several files in picker order.
    pub async fn add_jobs<I, S>(&self, paths: I) -> Result<Vec<Uuid>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = Vec::new();
        for path in paths {
            ids.push(self.add_job(path.as_ref()).await?);
        }
        Ok(ids)
    }

    /// Apply a user edit to the job at `index`.
    ///
    /// Time fields are normalized to `MM:SS`; malformed input is rejected and
    /// leaves the field untouched. Any applied edit moves a `Done` or
    /// `Failed` job back to `Pending`. Events for the edit and the reset are
    /// published before this returns.
    pub async fn update_field(
        &self,
        index: usize,
        field: JobField,
        value: &str,
    ) -> Result<UpdateOutcome> {
        let mut jobs = self.jobs.write().await;
        let len = jobs.len();
        let job = jobs
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;

        match field {
            JobField::StartTime | JobField::EndTime => {
                let Some(time) = ClipTime::parse(value) else {
                    warn!(job_id = %job.id, %field, value, "Rejected malformed time");
                    return Ok(UpdateOutcome::Rejected);
                };
                if field == JobField::StartTime {
                    job.start_time = Some(time);
                } else {
                    job.end_time = Some(time);
                }
            }
            JobField::Title => job.title = value.to_string(),
            JobField::Artist => job.artist = value.to_string(),
            JobField::OutputFormat => {
                job.output_format = value.parse::<OutputFormat>().map_err(Error::InvalidInput)?;
            }
        }

        let job_id = job.id;
        debug!(%job_id, %field, "Job field updated");
        self.events.emit(QueueEvent::JobUpdated { job_id, field });

        if job.status.is_finished() {
            let from = job.status;
            job.status = JobStatus::Pending;
            info!(%job_id, %from, "Edited job re-queued");
            self.events.emit(QueueEvent::StatusChanged {
                job_id,
                from,
                to: JobStatus::Pending,
            });
            return Ok(UpdateOutcome::Requeued);
        }

        Ok(UpdateOutcome::Applied)
    }

    /// Remove the jobs at `indices`.
    ///
    /// Every index is checked before anything is removed. Duplicates are
    /// ignored and the survivors keep their relative order. Returns the
    /// removed jobs in queue order.
    pub async fn remove_jobs(&self, indices: &[usize]) -> Result<Vec<ConversionJob>> {
        let mut jobs = self.jobs.write().await;
        let len = jobs.len();

        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        // Highest first so earlier positions stay valid.
        let mut removed: Vec<ConversionJob> =
            unique.iter().rev().map(|&i| jobs.remove(i)).collect();
        removed.reverse();

        if !removed.is_empty() {
            info!(count = removed.len(), remaining = jobs.len(), "Jobs removed");
            self.events.emit(QueueEvent::JobsRemoved {
                job_ids: removed.iter().map(|job| job.id).collect(),
            });
        }

        Ok(removed)
    }

    /// Copy of the full queue in display order.
    pub async fn snapshot(&self) -> Vec<ConversionJob> {
        self.jobs.read().await.clone()
    }

    pub async fn get(&self, index: usize) -> Option<ConversionJob> {
        self.jobs.read().await.get(index).cloned()
    }

    /// Current status of a job, or `None` if it was removed.
    pub async fn status_of(&self, job_id: Uuid) -> Option<JobStatus> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|job| job.id == job_id)
            .map(|job| job.status)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Move a `Pending` job to `Converting`.
    ///
    /// Returns the job as it stands at that moment, or `None` if it is gone or
    /// not `Pending`. Check and transition happen under one write lock, so a
    /// job can never be started twice.
    pub(crate) async fn try_begin_conversion(&self, job_id: Uuid) -> Option<ConversionJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.iter_mut().find(|job| job.id == job_id)?;
        if job.status != JobStatus::Pending {
            return None;
        }
        job.status = JobStatus::Converting;
        self.events.emit(QueueEvent::StatusChanged {
            job_id,
            from: JobStatus::Pending,
            to: JobStatus::Converting,
        });
        Some(job.clone())
    }

    /// Record the backend result for a `Converting` job.
    ///
    /// Returns `false` if the job was removed while converting.
    pub(crate) async fn finish_conversion(&self, job_id: Uuid, succeeded: bool) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) else {
            return false;
        };
        if job.status != JobStatus::Converting {
            warn!(%job_id, status = %job.status, "Finished job was not converting");
            return false;
        }
        let to = if succeeded {
            JobStatus::Done
        } else {
            JobStatus::Failed
        };
        job.status = to;
        self.events.emit(QueueEvent::StatusChanged {
            job_id,
            from: JobStatus::Converting,
            to,
        });
        true
    }

    /// Drop both trim points of a job, as a restored queue without times has.
    #[cfg(test)]
    pub(crate) async fn clear_times(&self, index: usize) {
        let mut jobs = self.jobs.write().await;
        let job = &mut jobs[index];
        job.start_time = None;
        job.end_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::new(EventBus::new(64))
    }

    async fn set_status(store: &JobStore, index: usize, status: JobStatus) {
        store.jobs.write().await[index].status = status;
    }

    #[tokio::test]
    async fn test_add_job_defaults() {
        let store = store();
        let id = store.add_job("/a/b/My Song.mp4").await.unwrap();

        let job = store.get(0).await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.display_name, "My Song.mp4");
        assert_eq!(job.title, "My Song");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.output_format, OutputFormat::Mp3);
    }

    #[tokio::test]
    async fn test_add_job_rejects_blank_path() {
        let store = store();
        assert!(matches!(
            store.add_job("  ").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_job_rejects_path_without_file_name() {
        let store = store();
        for path in ["/a/b/", "C:\\videos\\", "/"] {
            match store.add_job(path).await {
                Err(Error::InvalidInput(msg)) => assert!(msg.contains("no file name")),
                other => panic!("expected invalid input for {:?}, got {:?}", path, other),
            }
        }
        assert!(store.is_empty().await);

        store.add_job("/a/b/clip.mp4").await.unwrap();
        assert_eq!(store.get(0).await.unwrap().display_name, "clip.mp4");
    }

    #[tokio::test]
    async fn test_add_job_publishes_event() {
        let store = store();
        let mut sub = store.events().subscribe();
        let a = store.add_job("/a.mp4").await.unwrap();
        let b = store.add_job("/b.mp4").await.unwrap();
        assert_eq!(
            sub.drain(),
            vec![
                QueueEvent::JobAdded { job_id: a, index: 0 },
                QueueEvent::JobAdded { job_id: b, index: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_add_jobs_keeps_order() {
        let store = store();
        store
            .add_jobs(["/x/1.mp4", "/x/2.mkv", "/x/3.mov"])
            .await
            .unwrap();
        let names: Vec<String> = store
            .snapshot()
            .await
            .into_iter()
            .map(|job| job.display_name)
            .collect();
        assert_eq!(names, ["1.mp4", "2.mkv", "3.mov"]);
    }

    #[tokio::test]
    async fn test_update_time_normalizes() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();

        let outcome = store
            .update_field(0, JobField::StartTime, "1:5")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);
        let outcome = store
            .update_field(0, JobField::EndTime, "12:30")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        let job = store.get(0).await.unwrap();
        assert_eq!(job.start_time.unwrap().as_str(), "01:05");
        assert_eq!(job.end_time.unwrap().as_str(), "12:30");
    }

    #[tokio::test]
    async fn test_update_time_rejects_malformed_and_keeps_value() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();
        store
            .update_field(0, JobField::StartTime, "2:15")
            .await
            .unwrap();
        let mut sub = store.events().subscribe();

        for raw in ["abc", "1:2:3", ""] {
            let outcome = store
                .update_field(0, JobField::StartTime, raw)
                .await
                .unwrap();
            assert_eq!(outcome, UpdateOutcome::Rejected);
        }

        let job = store.get(0).await.unwrap();
        assert_eq!(job.start_time.unwrap().as_str(), "02:15");
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_time_does_not_requeue_finished_job() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();
        set_status(&store, 0, JobStatus::Done).await;

        let outcome = store
            .update_field(0, JobField::EndTime, "bad")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Rejected);
        assert_eq!(store.get(0).await.unwrap().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_edit_title_on_done_job_requeues() {
        let store = store();
        let id = store.add_job("/a.mp4").await.unwrap();
        set_status(&store, 0, JobStatus::Done).await;
        let mut sub = store.events().subscribe();

        let outcome = store
            .update_field(0, JobField::Title, "New Title")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Requeued);

        // Both notifications are visible as soon as the call returns.
        assert_eq!(
            sub.drain(),
            vec![
                QueueEvent::JobUpdated {
                    job_id: id,
                    field: JobField::Title
                },
                QueueEvent::StatusChanged {
                    job_id: id,
                    from: JobStatus::Done,
                    to: JobStatus::Pending
                },
            ]
        );
        let job = store.get(0).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.title, "New Title");
    }

    #[tokio::test]
    async fn test_every_editable_field_requeues_failed_job() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();

        for (field, value) in [
            (JobField::StartTime, "0:10"),
            (JobField::EndTime, "4:00"),
            (JobField::Title, "t"),
            (JobField::Artist, "a"),
            (JobField::OutputFormat, "wav"),
        ] {
            set_status(&store, 0, JobStatus::Failed).await;
            let outcome = store.update_field(0, field, value).await.unwrap();
            assert_eq!(outcome, UpdateOutcome::Requeued, "field {}", field);
            assert_eq!(store.get(0).await.unwrap().status, JobStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_edit_converting_job_keeps_status() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();
        set_status(&store, 0, JobStatus::Converting).await;

        let outcome = store
            .update_field(0, JobField::Artist, "Someone")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert_eq!(store.get(0).await.unwrap().status, JobStatus::Converting);
    }

    #[tokio::test]
    async fn test_update_output_format() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();

        store
            .update_field(0, JobField::OutputFormat, "FLAC")
            .await
            .unwrap();
        assert_eq!(
            store.get(0).await.unwrap().output_format,
            OutputFormat::Flac
        );

        let err = store
            .update_field(0, JobField::OutputFormat, "ogg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(
            store.get(0).await.unwrap().output_format,
            OutputFormat::Flac
        );
    }

    #[tokio::test]
    async fn test_update_out_of_range() {
        let store = store();
        store.add_job("/a.mp4").await.unwrap();
        let err = store
            .update_field(3, JobField::Title, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 1 }));
    }

    #[tokio::test]
    async fn test_remove_first_and_last_of_three() {
        let store = store();
        store
            .add_jobs(["/A.mp4", "/B.mp4", "/C.mp4"])
            .await
            .unwrap();

        let removed = store.remove_jobs(&[0, 2]).await.unwrap();

        let names: Vec<String> = removed.into_iter().map(|j| j.display_name).collect();
        assert_eq!(names, ["A.mp4", "C.mp4"]);
        let remaining: Vec<String> = store
            .snapshot()
            .await
            .into_iter()
            .map(|j| j.display_name)
            .collect();
        assert_eq!(remaining, ["B.mp4"]);
    }

    #[tokio::test]
    async fn test_remove_any_order_and_duplicates() {
        let store = store();
        store
            .add_jobs(["/0.mp4", "/1.mp4", "/2.mp4", "/3.mp4", "/4.mp4"])
            .await
            .unwrap();

        store.remove_jobs(&[1, 4, 1, 3]).await.unwrap();

        let remaining: Vec<String> = store
            .snapshot()
            .await
            .into_iter()
            .map(|j| j.display_name)
            .collect();
        assert_eq!(remaining, ["0.mp4", "2.mp4"]);
    }

    #[tokio::test]
    async fn test_remove_invalid_index_removes_nothing() {
        let store = store();
        store.add_jobs(["/a.mp4", "/b.mp4"]).await.unwrap();
        let mut sub = store.events().subscribe();

        let err = store.remove_jobs(&[0, 7]).await.unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 7, len: 2 }));
        assert_eq!(store.len().await, 2);
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn test_remove_publishes_ids() {
        let store = store();
        let ids = store.add_jobs(["/a.mp4", "/b.mp4"]).await.unwrap();
        let mut sub = store.events().subscribe();

        store.remove_jobs(&[1, 0]).await.unwrap();
        assert_eq!(
            sub.drain(),
            vec![QueueEvent::JobsRemoved { job_ids: ids }]
        );
    }

    #[tokio::test]
    async fn test_begin_conversion_only_from_pending() {
        let store = store();
        let id = store.add_job("/a.mp4").await.unwrap();

        assert!(store.try_begin_conversion(id).await.is_some());
        assert_eq!(store.status_of(id).await, Some(JobStatus::Converting));
        assert!(store.try_begin_conversion(id).await.is_none());

        assert!(store.finish_conversion(id, false).await);
        assert_eq!(store.status_of(id).await, Some(JobStatus::Failed));
        assert!(store.try_begin_conversion(id).await.is_none());
    }

    #[tokio::test]
    async fn test_finish_conversion_of_removed_job() {
        let store = store();
        let id = store.add_job("/a.mp4").await.unwrap();
        store.try_begin_conversion(id).await.unwrap();
        store.remove_jobs(&[0]).await.unwrap();

        assert!(!store.finish_conversion(id, true).await);
        assert_eq!(store.status_of(id).await, None);
    }
}
