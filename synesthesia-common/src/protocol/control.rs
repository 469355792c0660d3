//! Control protocol: producers (playback controllers) to server
//!
//! A producer reports its whole play state on every change. Each layer names the track it is
//! playing and whether it is playing or paused; layers are never updated partially.

use serde::{Deserialize, Serialize};

/// How a producer identifies the track a layer is playing
///
/// Unknown fields are ignored when deserializing, so two descriptions that differ only in
/// extraneous fields compare equal. Lengths are JSON numbers and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackMetadata {
    /// Track described by its tags and length
    #[serde(rename_all = "camelCase")]
    Meta {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artist: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        album: Option<String>,
        length_millis: f64,
    },
    /// Track addressed by file path (not resolvable to an identity)
    File { path: String },
}

impl TrackMetadata {
    /// Convenience constructor for tag-based metadata
    pub fn meta(title: impl Into<String>, artist: Option<&str>, length_millis: impl Into<f64>) -> Self {
        TrackMetadata::Meta {
            title: title.into(),
            artist: artist.map(str::to_string),
            album: None,
            length_millis: length_millis.into(),
        }
    }
}

/// Playing or paused sub-state of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerPlayState {
    #[serde(rename_all = "camelCase")]
    Playing {
        /// Wall-clock time (ms) at which position zero would have played
        effective_start_time_millis: f64,
        play_speed: f64,
    },
    #[serde(rename_all = "camelCase")]
    Paused {
        /// Elapsed position in the track (ms)
        position_millis: f64,
    },
}

impl LayerPlayState {
    pub fn is_playing(&self) -> bool {
        matches!(self, LayerPlayState::Playing { .. })
    }
}

/// One independent playback stream within a producer's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub file: TrackMetadata,
    pub state: LayerPlayState,
}

/// A producer's complete reported state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProducerPlayState {
    pub layers: Vec<Layer>,
}

/// Notifications sent by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlNotification {
    State { data: ProducerPlayState },
}

/// Playback-control requests the server forwards to a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
pub enum ControlRequest {
    Toggle,
    Pause,
    #[serde(rename_all = "camelCase")]
    GoToTime { position_millis: f64 },
}
