//! # Synesthesia Common Library
//!
//! Shared code for the Synesthesia server and its clients:
//! - Protocol value types (control, composer, broadcast)
//! - Cue file model
//! - Configuration loading and data folder resolution
//! - Utility functions

pub mod config;
pub mod error;
pub mod protocol;
pub mod time;

pub use error::{Error, Result};
pub use protocol::cue_file::{CueFile, CueFileLayer};
