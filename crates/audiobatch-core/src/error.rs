//! Error types for audiobatch.

use thiserror::Error;

/// Result type alias using audiobatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for audiobatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A selected job is missing its title or artist. Raised before any
    /// backend call; no job in the batch is started.
    #[error("Title and artist of \"{display_name}\" must not be empty")]
    Validation { display_name: String },

    /// A batch was requested with nothing selected.
    #[error("No files selected for conversion")]
    EmptySelection,

    /// A queue position does not exist.
    #[error("Job index {index} out of range (queue length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The conversion backend reported a failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// An environment setting could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value supplied by the caller was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
