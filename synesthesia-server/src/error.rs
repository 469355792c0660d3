//! Error types for synesthesia-server
//!
//! None of these are fatal to the process: the reconciliation loop logs them and turns them
//! into a skipped candidate or a `{success: false}` result.

use thiserror::Error;

/// Main error type for synesthesia-server
#[derive(Error, Debug)]
pub enum Error {
    /// Track addressed in a way that cannot be turned into a track id (file paths)
    #[error("Unsupported identity kind: {0}")]
    UnsupportedIdentityKind(String),

    /// No saved content for a track
    #[error("Not found: {0}")]
    NotFound(String),

    /// No active producer/layer to serve a playback-control request
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Durable write of a cue file failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Track id that is not 64 lower-case hex digits
    #[error("Invalid track id: {0}")]
    InvalidTrackId(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or received JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<synesthesia_common::Error> for Error {
    fn from(err: synesthesia_common::Error) -> Self {
        match err {
            synesthesia_common::Error::Config(msg) => Error::Config(msg),
        }
    }
}

/// Convenience Result type using synesthesia-server Error
pub type Result<T> = std::result::Result<T, Error>;
