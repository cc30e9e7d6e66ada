//! # audiobatch-core
//!
//! Core types, events, and configuration for the audiobatch job manager.
//!
//! This crate provides the data model shared by the job store, the batch
//! orchestrator and any presentation layer: queued jobs and their status
//! lifecycle, trim time normalization, backend request payloads, and the
//! event bus used for re-render notifications.

pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod paths;
pub mod time;

// Re-export commonly used types at crate root
pub use config::BatchConfig;
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, QueueEvent, Subscription};
pub use models::*;
pub use time::{normalize_time, ClipTime};
