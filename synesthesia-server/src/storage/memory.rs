//! In-memory cue store (tests and `--in-memory` runs)

use async_trait::async_trait;
use std::collections::HashMap;
use synesthesia_common::CueFile;
use tokio::sync::RwLock;

use super::CueStore;
use crate::error::{Error, Result};
use crate::state::TrackId;

#[derive(Debug, Default)]
pub struct MemoryCueStore {
    files: RwLock<HashMap<TrackId, CueFile>>,
}

impl MemoryCueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved files
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl CueStore for MemoryCueStore {
    async fn read(&self, id: &TrackId) -> Result<CueFile> {
        self.files
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file not found: {}", id)))
    }

    async fn write(&self, id: &TrackId, file: &CueFile) -> Result<()> {
        self.files.write().await.insert(id.clone(), file.clone());
        Ok(())
    }
}
