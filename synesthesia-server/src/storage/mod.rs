//! Persistence Gateway
//!
//! Durable key-value store of cue files keyed by track id. What is written is exactly what is
//! later read back, structurally.

mod file;
mod memory;

pub use file::FileCueStore;
pub use memory::MemoryCueStore;

use async_trait::async_trait;
use synesthesia_common::CueFile;

use crate::error::Result;
use crate::state::TrackId;

/// Durable cue file storage
#[async_trait]
pub trait CueStore: Send + Sync {
    /// Read the saved cue file for a track
    ///
    /// # Errors
    /// `Error::NotFound` when nothing has been saved for `id`.
    async fn read(&self, id: &TrackId) -> Result<CueFile>;

    /// Save a cue file, replacing any previous one and creating storage locations as needed
    async fn write(&self, id: &TrackId, file: &CueFile) -> Result<()>;
}
