//! Queue event types, envelope, and event bus for re-render notifications.
//!
//! Every mutation of the job queue publishes a [`QueueEvent`] on the
//! [`EventBus`]. The presentation layer subscribes once and re-renders the
//! full job list on each event; no partial-diff contract is implied.
//!
//! Events are published synchronously from the mutating call: by the time
//! `JobStore::update_field` (or any other mutation) returns, its events are
//! already queued on every live [`Subscription`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::defaults;
use crate::models::{JobField, JobStatus};

// ============================================================================
// Queue Event (domain payloads)
// ============================================================================

/// Something changed in the job queue.
///
/// Serialized as JSON with a `type` tag field, e.g.
/// `{"type":"StatusChanged","job_id":"...","from":"pending","to":"converting"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// A job was appended to the queue.
    JobAdded { job_id: Uuid, index: usize },
    /// Jobs were removed from the queue.
    JobsRemoved { job_ids: Vec<Uuid> },
    /// A user edit was applied to a job.
    JobUpdated { job_id: Uuid, field: JobField },
    /// A job moved between states.
    StatusChanged {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
    /// A conversion failed; `message` is meant to be shown to the user.
    ConversionFailed {
        job_id: Uuid,
        display_name: String,
        message: String,
    },
    /// A batch run began.
    BatchStarted { batch_size: usize },
    /// A batch run ended.
    BatchFinished {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

impl QueueEvent {
    /// Returns the namespaced event type for the envelope (e.g., `"job.added"`).
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            QueueEvent::JobAdded { .. } => "job.added",
            QueueEvent::JobsRemoved { .. } => "job.removed",
            QueueEvent::JobUpdated { .. } => "job.updated",
            QueueEvent::StatusChanged { .. } => "job.status_changed",
            QueueEvent::ConversionFailed { .. } => "job.conversion_failed",
            QueueEvent::BatchStarted { .. } => "batch.started",
            QueueEvent::BatchFinished { .. } => "batch.finished",
        }
    }

    /// Returns the single job this event relates to, if any.
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            QueueEvent::JobAdded { job_id, .. }
            | QueueEvent::JobUpdated { job_id, .. }
            | QueueEvent::StatusChanged { job_id, .. }
            | QueueEvent::ConversionFailed { job_id, .. } => Some(*job_id),
            QueueEvent::JobsRemoved { .. }
            | QueueEvent::BatchStarted { .. }
            | QueueEvent::BatchFinished { .. } => None,
        }
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// Self-describing wrapper around a [`QueueEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7, so ids sort by emission time).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"job.status_changed"`).
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: QueueEvent,
}

impl EventEnvelope {
    pub fn new(event: QueueEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus shared by the store and the orchestrator.
///
/// Cloning is cheap; clones publish into the same channel. Slow subscribers
/// that fall behind the buffer receive a lag notice and miss events, which is
/// harmless for full-list re-rendering.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(defaults::EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers. Without subscribers the event is
    /// dropped.
    pub fn emit(&self, event: QueueEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::trace!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Register a listener. The returned handle is the only way to receive
    /// events; dropping it or calling [`Subscription::unsubscribe`] ends the
    /// registration.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live registration on an [`EventBus`].
pub struct Subscription {
    rx: broadcast::Receiver<EventEnvelope>,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once every bus handle is gone. Lagged events are
    /// skipped with a warning.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every event published so far.
    pub fn drain(&mut self) -> Vec<QueueEvent> {
        std::iter::from_fn(|| self.try_recv())
            .map(|envelope| envelope.payload)
            .collect()
    }

    /// End the registration.
    pub fn unsubscribe(self) {}
}

// ============================================================================
// Tests
// ============================================================================
