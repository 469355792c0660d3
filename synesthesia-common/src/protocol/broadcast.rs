//! Broadcast protocol: simplified state pushed to downstream subscribers

use serde::{Deserialize, Serialize};

/// One playing layer as seen downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastLayerState {
    /// Content hash of the cue file for the layer's track
    pub file_hash: String,
    pub amplitude: f64,
    pub effective_start_time_millis: f64,
    pub play_speed: f64,
}

/// Every currently playing layer across every producer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BroadcastPlayState {
    pub layers: Vec<BroadcastLayerState>,
}
