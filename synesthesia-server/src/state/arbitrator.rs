//! Arbitrator
//!
//! Picks the single authoritative (producer, layer) pair from the current producer states.
//!
//! # Selection policy
//! 1. Any playing layer beats any paused layer, regardless of recency.
//! 2. Within a bucket, candidates are ordered by ascending `last_updated` of their producer and
//!    the first wins: the *least* recently updated producer is preferred. Ties keep connection
//!    order, then layer order.
//! 3. No layers at all means no active pair.
//!
//! Layers addressed by file path cannot be resolved; they are logged and skipped.

use chrono::{DateTime, Utc};
use synesthesia_common::protocol::{EditorPlayState, LayerPlayState, ProducerPlayState, TrackMeta};
use tracing::warn;

use crate::connections::ConnectionId;
use crate::state::identity::{IdentityResolver, ResolvedTrack};

/// Latest state reported by one connected producer
#[derive(Debug, Clone)]
pub struct ProducerState {
    pub connection: ConnectionId,
    /// `None` until the producer reports for the first time
    pub latest: Option<ProducerPlayState>,
    pub last_updated: DateTime<Utc>,
}

impl ProducerState {
    pub fn new(connection: ConnectionId, now: DateTime<Utc>) -> Self {
        Self {
            connection,
            latest: None,
            last_updated: now,
        }
    }
}

/// The authoritative (producer, layer) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePair {
    pub producer: ConnectionId,
    pub layer_index: usize,
    pub track: ResolvedTrack,
    pub state: LayerPlayState,
}

impl ActivePair {
    /// Play state pushed to editors
    pub fn editor_play_state(&self) -> EditorPlayState {
        EditorPlayState {
            duration_millis: self.track.duration_millis,
            meta: TrackMeta {
                id: self.track.id.to_string(),
                info: self.track.info.clone(),
            },
            state: self.state.clone(),
        }
    }
}

struct Candidate {
    pair: ActivePair,
    last_updated: DateTime<Utc>,
}

/// Select the active pair from the given producers
pub fn select_active<'a, I>(producers: I, identities: &mut IdentityResolver) -> Option<ActivePair>
where
    I: IntoIterator<Item = &'a ProducerState>,
{
    let mut playing = Vec::new();
    let mut paused = Vec::new();

    for producer in producers {
        let Some(latest) = &producer.latest else {
            continue;
        };
        for (layer_index, layer) in latest.layers.iter().enumerate() {
            let track = match identities.resolve_track(&layer.file) {
                Ok(track) => track,
                Err(e) => {
                    warn!(producer = %producer.connection, layer_index, "Skipping layer: {}", e);
                    continue;
                }
            };
            let candidate = Candidate {
                pair: ActivePair {
                    producer: producer.connection,
                    layer_index,
                    track,
                    state: layer.state.clone(),
                },
                last_updated: producer.last_updated,
            };
            if layer.state.is_playing() {
                playing.push(candidate);
            } else {
                paused.push(candidate);
            }
        }
    }

    first_by_last_updated(playing).or_else(|| first_by_last_updated(paused))
}

fn first_by_last_updated(mut candidates: Vec<Candidate>) -> Option<ActivePair> {
    // Stable sort keeps connection and layer order among equal timestamps
    candidates.sort_by_key(|c| c.last_updated);
    candidates.into_iter().next().map(|c| c.pair)
}
