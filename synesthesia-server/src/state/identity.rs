//! Identity Resolver
//!
//! Assigns every track a stable, predictable id derived from its metadata.
//!
//! # Canonical form
//! Only `title`, `artist`, `album` and `lengthMillis` take part, in that order, with absent
//! optional fields omitted. A whole-number length is written as an integer (`1000`, never
//! `1000.0`); any other length keeps its shortest decimal form. The compact JSON serialization
//! of that record is hashed with SHA-256 and hex-encoded. Because the canonical form is fixed,
//! ids survive process restarts; the in-process cache only saves rehashing metadata seen before.

use serde::Serialize;
use serde_json::Number;
use sha2::{Digest, Sha256};
use std::fmt;
use synesthesia_common::protocol::{CueFile, TrackInfo, TrackMetadata};
use tracing::debug;

use crate::error::{Error, Result};

/// Content-derived track identifier (lower-case hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this has the shape of a resolved id (64 lower-case hex digits)
    ///
    /// Ids arriving from editors are not trusted to be well formed.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == TRACK_ID_LEN
            && self.0.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

const TRACK_ID_LEN: usize = 64;

/// Largest length written as an integer; beyond it `f64` stops being exact
const MAX_EXACT_MILLIS: f64 = 9_007_199_254_740_991.0;

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A track reference resolved to its id plus what editors display
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub id: TrackId,
    pub duration_millis: f64,
    pub info: TrackInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalMeta<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artist: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    album: Option<&'a str>,
    length_millis: Number,
}

/// Maps track metadata to track ids
///
/// The cache is a linear list compared by structural equality. It is never evicted; the number
/// of distinct tracks seen in one session is small.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    cache: Vec<(TrackMetadata, TrackId)>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve metadata to its track id
    ///
    /// # Errors
    /// `UnsupportedIdentityKind` for path-addressed tracks.
    pub fn resolve(&mut self, metadata: &TrackMetadata) -> Result<TrackId> {
        if let Some((_, id)) = self.cache.iter().find(|(seen, _)| seen == metadata) {
            return Ok(id.clone());
        }

        let id = canonical_id(metadata)?;
        debug!(track_id = %id, "Assigned new track id");
        self.cache.push((metadata.clone(), id.clone()));
        Ok(id)
    }

    /// Resolve metadata to id, duration and display info
    pub fn resolve_track(&mut self, metadata: &TrackMetadata) -> Result<ResolvedTrack> {
        let id = self.resolve(metadata)?;
        match metadata {
            TrackMetadata::Meta {
                title,
                artist,
                length_millis,
                ..
            } => Ok(ResolvedTrack {
                id,
                duration_millis: *length_millis,
                info: TrackInfo {
                    title: title.clone(),
                    artist: artist.clone(),
                },
            }),
            TrackMetadata::File { path } => Err(unsupported(path)),
        }
    }

    /// Number of distinct metadata values seen so far
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

fn unsupported(path: &str) -> Error {
    Error::UnsupportedIdentityKind(format!("file based tracks are not supported yet ({})", path))
}

/// Compute the canonical id without touching any cache
pub fn canonical_id(metadata: &TrackMetadata) -> Result<TrackId> {
    match metadata {
        TrackMetadata::Meta {
            title,
            artist,
            album,
            length_millis,
        } => {
            let canonical = CanonicalMeta {
                title,
                artist: artist.as_deref(),
                album: album.as_deref(),
                length_millis: canonical_length(*length_millis)?,
            };
            let bytes = serde_json::to_vec(&canonical)?;
            Ok(TrackId(format!("{:x}", Sha256::digest(&bytes))))
        }
        TrackMetadata::File { path } => Err(unsupported(path)),
    }
}

fn canonical_length(length_millis: f64) -> Result<Number> {
    if length_millis.fract() == 0.0 && (0.0..=MAX_EXACT_MILLIS).contains(&length_millis) {
        return Ok(Number::from(length_millis as u64));
    }
    Number::from_f64(length_millis)
        .ok_or_else(|| Error::Internal(format!("track length is not finite: {}", length_millis)))
}

/// Content hash of a cue file, as broadcast to subscribers
pub fn cue_file_hash(file: &CueFile) -> Result<String> {
    let bytes = serde_json::to_vec(file)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOME_SONG_ID: &str = "b0c67a085be2f2f9a311f680d17b6c6307a83db1e443eb920ddd2266854d0666";

    fn meta_from(value: serde_json::Value) -> TrackMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_basic_title_artist_meta() {
        let mut resolver = IdentityResolver::new();
        let id = resolver
            .resolve(&meta_from(json!({
                "type": "meta",
                "title": "some song",
                "artist": "some artist",
                "lengthMillis": 1234
            })))
            .unwrap();
        assert_eq!(id.as_str(), SOME_SONG_ID);
    }

    #[test]
    fn test_reordered_fields_same_id() {
        let mut resolver = IdentityResolver::new();
        let id = resolver
            .resolve(&meta_from(json!({
                "artist": "some artist",
                "lengthMillis": 1234,
                "type": "meta",
                "title": "some song"
            })))
            .unwrap();
        assert_eq!(id.as_str(), SOME_SONG_ID);
    }

    #[test]
    fn test_extra_data_same_id() {
        let mut resolver = IdentityResolver::new();
        let id = resolver
            .resolve(&meta_from(json!({
                "artist": "some artist",
                "lengthMillis": 1234,
                "type": "meta",
                "title": "some song",
                "foo": "bar"
            })))
            .unwrap();
        assert_eq!(id.as_str(), SOME_SONG_ID);
    }

    #[test]
    fn test_absent_artist_vectors() {
        let absent = canonical_id(&meta_from(json!({
            "type": "meta", "title": "some song", "lengthMillis": 1234
        })))
        .unwrap();
        let null = canonical_id(&meta_from(json!({
            "type": "meta", "title": "some song", "artist": null, "lengthMillis": 1234
        })))
        .unwrap();
        let empty = canonical_id(&meta_from(json!({
            "type": "meta", "title": "some song", "artist": "", "lengthMillis": 1234
        })))
        .unwrap();

        assert_eq!(
            absent.as_str(),
            "0c3f3d628d33b4db7d7dfde2132c78bcbb2985e4a492333413ed8f717e63606e"
        );
        assert_eq!(absent, null);
        assert_eq!(
            empty.as_str(),
            "79ff413cab5e69c6e7291de2724244349cd12a47f83a9b93b1a9a77768ebe85e"
        );
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_cache_hit_matches_fresh_resolver() {
        let metadata = TrackMetadata::meta("A", None, 1000);
        let mut first = IdentityResolver::new();
        let a = first.resolve(&metadata).unwrap();
        let b = first.resolve(&metadata).unwrap();
        assert_eq!(a, b);
        assert_eq!(first.cached_len(), 1);

        let mut second = IdentityResolver::new();
        assert_eq!(second.resolve(&metadata).unwrap(), a);
        assert_eq!(
            a.as_str(),
            "af9da4fcf9cf51e58e792f4bace92aa58e9ce8e8cf035fd8e39394299409e1dd"
        );
    }

    #[test]
    fn test_path_metadata_unsupported() {
        let mut resolver = IdentityResolver::new();
        let err = resolver
            .resolve(&TrackMetadata::File { path: "/music/a.mp3".to_string() })
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedIdentityKind(_)));
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn test_resolve_track_carries_duration_and_info() {
        let mut resolver = IdentityResolver::new();
        let track = resolver
            .resolve_track(&TrackMetadata::meta("A", Some("B"), 1000))
            .unwrap();
        assert_eq!(track.duration_millis, 1000.0);
        assert_eq!(track.info.title, "A");
        assert_eq!(track.info.artist.as_deref(), Some("B"));
    }

    #[test]
    fn test_cue_file_hash_tracks_content() {
        let a = CueFile::new(1000.0, vec![]);
        let b = CueFile::new(2000.0, vec![]);
        assert_eq!(cue_file_hash(&a).unwrap(), cue_file_hash(&a.clone()).unwrap());
        assert_ne!(cue_file_hash(&a).unwrap(), cue_file_hash(&b).unwrap());
        assert_eq!(cue_file_hash(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_fractional_length_vector() {
        let id = canonical_id(&meta_from(json!({
            "type": "meta", "title": "A", "lengthMillis": 215000.4
        })))
        .unwrap();
        assert_eq!(
            id.as_str(),
            "59f8adcd29cbb7275fd1c9d4cf168d46a2e96dabf002f50c69c9fbc71a457677"
        );
    }

    #[test]
    fn test_whole_float_length_matches_integer_length() {
        let float = canonical_id(&meta_from(json!({
            "type": "meta", "title": "A", "lengthMillis": 1000.0
        })))
        .unwrap();
        let integer = canonical_id(&TrackMetadata::meta("A", None, 1000)).unwrap();
        assert_eq!(float, integer);
        assert_eq!(
            float.as_str(),
            "af9da4fcf9cf51e58e792f4bace92aa58e9ce8e8cf035fd8e39394299409e1dd"
        );
    }

    #[test]
    fn test_well_formed_ids() {
        assert!(TrackId::from(SOME_SONG_ID).is_well_formed());
        assert!(canonical_id(&TrackMetadata::meta("A", None, 1)).unwrap().is_well_formed());
        assert!(!TrackId::from("../../escaped").is_well_formed());
        assert!(!TrackId::from(SOME_SONG_ID.to_uppercase().as_str()).is_well_formed());
        assert!(!TrackId::from(&SOME_SONG_ID[..63]).is_well_formed());
    }
}
