//! Common error types for Synesthesia

use thiserror::Error;

/// Common result type for Synesthesia operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Synesthesia crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
