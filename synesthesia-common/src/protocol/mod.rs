//! Protocol value types
//!
//! Three participant protocols share this module:
//! - `control`: producers (playback controllers) reporting layered play state
//! - `composer`: editors viewing and editing the active track's cue file
//! - `broadcast`: downstream subscribers receiving the simplified mix
//!
//! All types serialize to camelCase JSON with a `type` tag where they are sum types.

pub mod broadcast;
pub mod composer;
pub mod control;
pub mod cue_file;
pub mod envelope;

pub use broadcast::{BroadcastLayerState, BroadcastPlayState};
pub use composer::{
    EditorNotification, EditorPlayState, EditorRequest, FileAction, FileState, TrackInfo,
    TrackMeta,
};
pub use control::{ControlNotification, ControlRequest, Layer, LayerPlayState, ProducerPlayState, TrackMetadata};
pub use cue_file::{CueFile, CueFileEvent, CueFileEventState, CueFileLayer};
pub use envelope::Envelope;

use serde::{Deserialize, Serialize};

/// Generic request outcome shared by the control and composer protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
}

impl Response {
    pub fn success() -> Self {
        Self { success: true }
    }

    pub fn failure() -> Self {
        Self { success: false }
    }
}

impl From<bool> for Response {
    fn from(success: bool) -> Self {
        Self { success }
    }
}
