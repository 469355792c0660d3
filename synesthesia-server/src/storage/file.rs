//! File-backed cue store
//!
//! One JSON document per track at `<data_dir>/cue-files/<track id>.json`. Only well-formed ids
//! (64 lower-case hex digits) map to a path, so nothing outside `cue-files/` is ever touched.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use synesthesia_common::CueFile;
use tracing::debug;

use super::CueStore;
use crate::error::{Error, Result};
use crate::state::TrackId;

const CUE_FILES_DIR: &str = "cue-files";

#[derive(Debug, Clone)]
pub struct FileCueStore {
    dir: PathBuf,
}

impl FileCueStore {
    /// Store rooted at `data_dir`; nothing is created until the first write
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join(CUE_FILES_DIR),
        }
    }

    /// Folder holding the cue files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &TrackId) -> Result<PathBuf> {
        if !id.is_well_formed() {
            return Err(Error::InvalidTrackId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl CueStore for FileCueStore {
    async fn read(&self, id: &TrackId) -> Result<CueFile> {
        let path = self.path_for(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("file not found: {}", id)));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, id: &TrackId, file: &CueFile) -> Result<()> {
        let path = self.path_for(id)?;
        let json = serde_json::to_vec_pretty(file)?;

        let persist_err =
            |e: std::io::Error| Error::PersistenceFailure(format!("{}: {}", path.display(), e));

        tokio::fs::create_dir_all(&self.dir).await.map_err(persist_err)?;

        // Write beside the target then rename, so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(persist_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(persist_err)?;

        debug!(track_id = %id, path = %path.display(), "Saved cue file");
        Ok(())
    }
}
