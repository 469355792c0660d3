//! Reconciliation engine
//!
//! - `identity`: track metadata to content-addressed track ids
//! - `revisions`: bounded per-track edit history with undo/redo/save
//! - `arbitrator`: choice of the single authoritative (producer, layer) pair
//! - `orchestrator`: the event loop tying them to connected participants

pub mod arbitrator;
pub mod identity;
pub mod orchestrator;
pub mod revisions;

pub use arbitrator::{select_active, ActivePair, ProducerState};
pub use identity::{canonical_id, cue_file_hash, IdentityResolver, ResolvedTrack, TrackId};
pub use orchestrator::Orchestrator;
pub use revisions::{empty_file, RevisionStore};
