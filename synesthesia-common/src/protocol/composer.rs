//! Composer protocol: server to editors and back

use serde::{Deserialize, Serialize};

use super::control::LayerPlayState;
use super::cue_file::CueFile;

/// Display information about the active track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

/// Identity and display information of the active track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMeta {
    pub id: String,
    pub info: TrackInfo,
}

/// Play state of the active (producer, layer) pair as seen by editors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorPlayState {
    pub duration_millis: f64,
    pub meta: TrackMeta,
    pub state: LayerPlayState,
}

/// Which edit actions are currently possible for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub can_save: bool,
}

/// Notifications exchanged with editors
///
/// The server sends both variants. Editors send `CueFileModified` after a local edit, in which
/// case `file_state` is ignored and usually omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EditorNotification {
    State {
        data: Option<EditorPlayState>,
    },
    #[serde(rename_all = "camelCase")]
    CueFileModified {
        id: String,
        file: CueFile,
        #[serde(default)]
        file_state: FileState,
    },
}

/// Edit actions on a track's unsaved history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Undo,
    Redo,
    Save,
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileAction::Undo => write!(f, "undo"),
            FileAction::Redo => write!(f, "redo"),
            FileAction::Save => write!(f, "save"),
        }
    }
}

/// Requests issued by editors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
pub enum EditorRequest {
    Toggle,
    Pause,
    #[serde(rename_all = "camelCase")]
    GoToTime { position_millis: f64 },
    FileAction { id: String, action: FileAction },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_cue_file_modified_without_file_state() {
        let notification: EditorNotification = serde_json::from_value(json!({
            "type": "cue-file-modified",
            "id": "abc",
            "file": { "lengthMillis": 1000, "layers": [] }
        }))
        .unwrap();

        match notification {
            EditorNotification::CueFileModified { id, file, file_state } => {
                assert_eq!(id, "abc");
                assert_eq!(file.length_millis, 1000.0);
                assert_eq!(file_state, FileState::default());
            }
            other => panic!("unexpected notification {:?}", other),
        }
    }

    #[test]
    fn test_null_state_notification() {
        let value = serde_json::to_value(EditorNotification::State { data: None }).unwrap();
        assert_eq!(value, json!({"type": "state", "data": null}));
    }

    #[test]
    fn test_file_action_request() {
        let request: EditorRequest = serde_json::from_value(json!({
            "request": "file-action",
            "id": "abc",
            "action": "save"
        }))
        .unwrap();
        assert_eq!(
            request,
            EditorRequest::FileAction { id: "abc".to_string(), action: FileAction::Save }
        );
    }

    #[test]
    fn test_go_to_time_request() {
        let request: EditorRequest = serde_json::from_value(json!({
            "request": "go-to-time",
            "positionMillis": 1500.5
        }))
        .unwrap();
        assert_eq!(request, EditorRequest::GoToTime { position_millis: 1500.5 });
    }
}
