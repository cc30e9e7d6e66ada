//! # audiobatch-jobs
//!
//! Job queue and batch conversion for audiobatch.
//!
//! This crate provides:
//! - [`JobStore`]: the ordered in-memory queue and its edit rules
//! - [`BatchOrchestrator`]: strictly sequential conversion of selected jobs
//! - [`ConversionBackend`]: the seam to the transcoder, with an ffmpeg
//!   implementation
//!
//! ## Example
//!
//! ```ignore
//! use std::collections::HashSet;
//! use std::sync::Arc;
//! use audiobatch_core::{BatchConfig, EventBus, JobField};
//! use audiobatch_jobs::{BatchOrchestrator, FfmpegBackend, JobStore};
//!
//! let bus = EventBus::default();
//! let store = JobStore::new(bus.clone());
//! let mut events = bus.subscribe();
//!
//! let id = store.add_job("/videos/live.mp4").await?;
//! store.update_field(0, JobField::Artist, "The Band").await?;
//!
//! let orchestrator = BatchOrchestrator::new(store, Arc::new(FfmpegBackend::from_env()));
//! let summary = orchestrator
//!     .run_batch(&HashSet::from([id]), &BatchConfig::from_env()?)
//!     .await?;
//! ```

pub mod backend;
pub mod ffmpeg;
pub mod orchestrator;
pub mod store;

// Re-export core types
pub use audiobatch_core::*;

pub use backend::{ConversionBackend, NoOpBackend};
pub use ffmpeg::{FfmpegBackend, FfmpegConfig};
pub use orchestrator::{select_eligible, validate, BatchOrchestrator, BatchSummary};
pub use store::{JobStore, UpdateOutcome};
