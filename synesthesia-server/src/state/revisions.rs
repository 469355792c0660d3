//! Revision Store
//!
//! Per-track bounded history of unsaved cue file edits with undo/redo.
//!
//! A history is created on the first edit to a track and discarded when the track is saved:
//! at that point the edits are merged into durable storage and the undo trail goes with them.

use std::collections::{HashMap, VecDeque};
use synesthesia_common::config::DEFAULT_MAX_REVISIONS_PER_FILE;
use synesthesia_common::protocol::FileState;
use synesthesia_common::CueFile;
use tracing::{debug, info};

use crate::error::Result;
use crate::state::TrackId;
use crate::storage::CueStore;

/// New cue file with no layers, for tracks nobody has edited or saved yet
pub fn empty_file(duration_millis: f64) -> CueFile {
    CueFile::new(duration_millis, Vec::new())
}

/// Unsaved history of one track
#[derive(Debug, Default)]
struct TrackHistory {
    /// All stored versions of the file, oldest first
    revisions: VecDeque<CueFile>,
    /// Versions that have been undone, most recently undone last
    undone: Vec<CueFile>,
}

/// Bounded undo/redo histories keyed by track id
#[derive(Debug)]
pub struct RevisionStore {
    histories: HashMap<TrackId, TrackHistory>,
    max_revisions: usize,
}

impl Default for RevisionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REVISIONS_PER_FILE)
    }
}

impl RevisionStore {
    /// Create a store keeping at most `max_revisions` revisions per track (minimum 1)
    pub fn new(max_revisions: usize) -> Self {
        Self {
            histories: HashMap::new(),
            max_revisions: max_revisions.max(1),
        }
    }

    /// Record a new revision
    ///
    /// A revision equal to the current one is ignored entirely, leaving the redo stack intact.
    pub fn update(&mut self, id: &TrackId, file: CueFile) {
        let history = self.histories.entry(id.clone()).or_default();
        if history.revisions.back() == Some(&file) {
            debug!(track_id = %id, "Revision unchanged, ignoring");
            return;
        }

        history.revisions.push_back(file);
        while history.revisions.len() > self.max_revisions {
            history.revisions.pop_front();
        }
        history.undone.clear();
        debug!(track_id = %id, revisions = history.revisions.len(), "Recorded revision");
    }

    /// Latest revision, if the track has unsaved history
    pub fn current_revision(&self, id: &TrackId) -> Option<&CueFile> {
        self.histories.get(id).and_then(|h| h.revisions.back())
    }

    /// Undo a modification, return true if successful and false otherwise
    ///
    /// The earliest recorded revision cannot itself be undone.
    pub fn undo(&mut self, id: &TrackId) -> bool {
        let Some(history) = self.histories.get_mut(id) else {
            return false;
        };
        if history.revisions.len() <= 1 {
            return false;
        }
        match history.revisions.pop_back() {
            Some(revision) => {
                history.undone.push(revision);
                debug!(track_id = %id, "Undo");
                true
            }
            None => false,
        }
    }

    /// Redo a modification, return true if successful and false otherwise
    pub fn redo(&mut self, id: &TrackId) -> bool {
        let Some(history) = self.histories.get_mut(id) else {
            return false;
        };
        match history.undone.pop() {
            Some(revision) => {
                history.revisions.push_back(revision);
                debug!(track_id = %id, "Redo");
                true
            }
            None => false,
        }
    }

    /// Write the current revision to `store` and drop the track's history
    ///
    /// Returns `Ok(false)` without touching the store when there is nothing unsaved. A failed
    /// write is returned as an error and the history is kept so the save can be retried.
    pub async fn save(&mut self, store: &dyn CueStore, id: &TrackId) -> Result<bool> {
        let Some(current) = self.current_revision(id) else {
            return Ok(false);
        };
        store.write(id, current).await?;
        self.histories.remove(id);
        info!(track_id = %id, "Saved cue file");
        Ok(true)
    }

    /// Edit capabilities for a track, derived from its history
    pub fn file_state(&self, id: &TrackId) -> FileState {
        match self.histories.get(id) {
            Some(history) => FileState {
                can_undo: history.revisions.len() > 1,
                can_redo: !history.undone.is_empty(),
                can_save: true,
            },
            None => FileState::default(),
        }
    }

    /// Number of revisions held for a track
    pub fn revision_count(&self, id: &TrackId) -> usize {
        self.histories.get(id).map_or(0, |h| h.revisions.len())
    }

    pub fn max_revisions(&self) -> usize {
        self.max_revisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::MemoryCueStore;
    use async_trait::async_trait;

    fn file(n: u32) -> CueFile {
        empty_file(n.into())
    }

    fn id() -> TrackId {
        TrackId::from("track")
    }

    struct FailingStore;

    #[async_trait]
    impl CueStore for FailingStore {
        async fn read(&self, id: &TrackId) -> Result<CueFile> {
            Err(Error::NotFound(id.to_string()))
        }

        async fn write(&self, _id: &TrackId, _file: &CueFile) -> Result<()> {
            Err(Error::PersistenceFailure("disk full".to_string()))
        }
    }

    #[test]
    fn test_no_history() {
        let mut store = RevisionStore::default();
        assert!(store.current_revision(&id()).is_none());
        assert!(!store.undo(&id()));
        assert!(!store.redo(&id()));
        assert_eq!(store.file_state(&id()), FileState::default());
    }

    #[test]
    fn test_bounded_history_keeps_most_recent() {
        let mut store = RevisionStore::new(30);
        for n in 0..35 {
            store.update(&id(), file(n));
        }
        assert_eq!(store.revision_count(&id()), 30);
        assert_eq!(store.current_revision(&id()), Some(&file(34)));

        // Oldest 5 were evicted: undoing all the way stops at revision 5
        while store.undo(&id()) {}
        assert_eq!(store.current_revision(&id()), Some(&file(5)));
    }

    #[test]
    fn test_duplicate_update_is_noop_and_keeps_redo() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));
        store.update(&id(), file(2));
        assert!(store.undo(&id()));
        assert!(store.file_state(&id()).can_redo);

        store.update(&id(), file(1));
        assert_eq!(store.revision_count(&id()), 1);
        assert!(store.file_state(&id()).can_redo);
    }

    #[test]
    fn test_new_update_clears_redo() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));
        store.update(&id(), file(2));
        assert!(store.undo(&id()));

        store.update(&id(), file(3));
        assert!(!store.redo(&id()));
        assert_eq!(store.current_revision(&id()), Some(&file(3)));
    }

    #[test]
    fn test_undo_redo_duality() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));
        store.update(&id(), file(2));

        assert!(store.undo(&id()));
        assert_eq!(store.current_revision(&id()), Some(&file(1)));
        assert!(store.redo(&id()));
        assert_eq!(store.current_revision(&id()), Some(&file(2)));
        assert!(!store.redo(&id()));
    }

    #[test]
    fn test_single_revision_cannot_undo() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));

        assert!(!store.undo(&id()));
        assert_eq!(store.revision_count(&id()), 1);
        assert_eq!(
            store.file_state(&id()),
            FileState { can_undo: false, can_redo: false, can_save: true }
        );
    }

    #[test]
    fn test_file_state_tracks_stacks() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));
        store.update(&id(), file(2));
        assert_eq!(
            store.file_state(&id()),
            FileState { can_undo: true, can_redo: false, can_save: true }
        );
        store.undo(&id());
        assert_eq!(
            store.file_state(&id()),
            FileState { can_undo: false, can_redo: true, can_save: true }
        );
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let mut store = RevisionStore::new(0);
        store.update(&id(), file(1));
        store.update(&id(), file(2));
        assert_eq!(store.max_revisions(), 1);
        assert_eq!(store.revision_count(&id()), 1);
        assert_eq!(store.current_revision(&id()), Some(&file(2)));
    }

    #[tokio::test]
    async fn test_save_writes_current_and_clears_history() {
        let mut store = RevisionStore::default();
        let persistence = MemoryCueStore::new();
        store.update(&id(), file(1));
        store.update(&id(), file(2));

        assert!(store.save(&persistence, &id()).await.unwrap());
        assert_eq!(persistence.read(&id()).await.unwrap(), file(2));
        assert!(store.current_revision(&id()).is_none());
        assert!(!store.undo(&id()));
        assert!(!store.redo(&id()));
    }

    #[tokio::test]
    async fn test_save_without_history_skips_store() {
        let mut store = RevisionStore::default();
        let persistence = MemoryCueStore::new();

        assert!(!store.save(&persistence, &id()).await.unwrap());
        assert_eq!(persistence.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_history() {
        let mut store = RevisionStore::default();
        store.update(&id(), file(1));
        store.update(&id(), file(2));

        let err = store.save(&FailingStore, &id()).await.unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure(_)));
        assert_eq!(store.current_revision(&id()), Some(&file(2)));
        assert!(store.undo(&id()));
    }
}
