//! Cue file model
//!
//! A cue file is the editable payload for one track: its length plus an ordered list of cue
//! layers. The server only ever compares whole files for equality and hashes their
//! serialization, so every level keeps fields it does not know about and writes them back
//! unchanged. Times are plain JSON numbers and may be fractional.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Editable cue content for one track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueFile {
    /// Track length in milliseconds
    pub length_millis: f64,
    /// Cue layers, in display order
    pub layers: Vec<CueFileLayer>,
    /// Fields owned by editors
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CueFile {
    pub fn new(length_millis: f64, layers: Vec<CueFileLayer>) -> Self {
        Self {
            length_millis,
            layers,
            extra: Map::new(),
        }
    }
}

/// One layer of cue events (e.g. percussion)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueFileLayer {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
    #[serde(default)]
    pub events: Vec<CueFileEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CueFileLayer {
    pub fn new(kind: impl Into<String>, settings: Value, events: Vec<CueFileEvent>) -> Self {
        Self {
            kind: kind.into(),
            settings,
            events,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueFileEvent {
    pub timestamp_millis: f64,
    pub states: Vec<CueFileEventState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueFileEventState {
    pub millis_delay: f64,
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_composer_file() {
        let file: CueFile = serde_json::from_value(json!({
            "lengthMillis": 12345,
            "layers": [{
                "kind": "percussion",
                "settings": { "defaultAmplitude": 1 },
                "events": [{
                    "timestampMillis": 500,
                    "states": [{ "millisDelay": 0, "data": { "amplitude": 1 } }]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(file.length_millis, 12345.0);
        assert_eq!(file.layers.len(), 1);
        assert_eq!(file.layers[0].kind, "percussion");
        assert_eq!(file.layers[0].events[0].timestamp_millis, 500.0);
    }

    #[test]
    fn test_fractional_times() {
        let file: CueFile = serde_json::from_value(json!({
            "lengthMillis": 215000.4,
            "layers": [{
                "kind": "percussion",
                "events": [{
                    "timestampMillis": 512.25,
                    "states": [{ "millisDelay": 1.5, "data": null }]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(file.length_millis, 215000.4);
        let event = &file.layers[0].events[0];
        assert_eq!(event.timestamp_millis, 512.25);
        assert_eq!(event.states[0].millis_delay, 1.5);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let input = json!({
            "lengthMillis": 1000.5,
            "name": "my cues",
            "layers": [{
                "kind": "percussion",
                "label": "kick",
                "settings": { "defaultAmplitude": 1 },
                "events": [{
                    "timestampMillis": 10.5,
                    "muted": true,
                    "states": [{ "millisDelay": 0.25, "data": { "amplitude": 1 }, "curve": "ease" }]
                }]
            }]
        });

        let file: CueFile = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(file.extra["name"], "my cues");
        assert_eq!(file.layers[0].extra["label"], "kick");

        assert_eq!(serde_json::to_value(&file).unwrap(), input);
    }

    #[test]
    fn test_absent_settings_stay_absent() {
        let input = json!({ "lengthMillis": 1.5, "layers": [{ "kind": "k", "events": [] }] });
        let file: CueFile = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&file).unwrap(), input);
    }

    #[test]
    fn test_equality_ignores_json_key_order() {
        let a: CueFile = serde_json::from_str(
            r#"{"lengthMillis":10,"layers":[{"kind":"k","settings":{"a":1,"b":2},"events":[]}]}"#,
        )
        .unwrap();
        let b: CueFile = serde_json::from_str(
            r#"{"layers":[{"events":[],"settings":{"b":2,"a":1},"kind":"k"}],"lengthMillis":10}"#,
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
