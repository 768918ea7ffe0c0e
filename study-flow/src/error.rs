//! Error types for study-flow
//!
//! Component-specific failures (`PlaybackError`, `FlowError`) live next to
//! their components; this is the error for I/O-facing operations.

use thiserror::Error;

/// Main error type for backend access (database, store service)
#[derive(Error, Debug)]
pub enum Error {
    /// Shared-library errors (database, config, serialization)
    #[error(transparent)]
    Common(#[from] study_common::Error),

    /// HTTP transport failure talking to the store service
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Store service answered with a non-success status
    #[error("Store rejected request ({status}): {message}")]
    Store { status: u16, message: String },
}

/// Convenience Result type using study-flow Error
pub type Result<T> = std::result::Result<T, Error>;
