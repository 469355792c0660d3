//! Reconciliation Orchestrator
//!
//! Owns the producer, editor and subscriber registries and reacts to every
//! [`ConnectionEvent`]. Events are handled one at a time, each to completion, so the
//! arbitration, the revision histories and the "last file sent to all editors" comparison
//! never need locking. Every push is computed from the in-memory state at the time it is
//! sent, so no participant sees an older state after a newer one.
//!
//! # Content resolution
//! The cue file shown for a track comes from, in order:
//! 1. the latest unsaved revision
//! 2. the cue store
//! 3. a new empty file of the track's duration

use std::collections::BTreeMap;
use std::sync::Arc;
use synesthesia_common::protocol::{
    BroadcastLayerState, BroadcastPlayState, ControlRequest, EditorNotification, EditorRequest, FileAction,
    FileState, LayerPlayState, ProducerPlayState, Response, TrackMetadata,
};
use synesthesia_common::{time, CueFile};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connections::{
    ConnectionEvent, ConnectionId, EditorSink, OrchestratorHandle, ProducerCommand, ProducerSink,
    StatusSnapshot, SubscriberSink,
};
use crate::error::Error;
use crate::state::arbitrator::{select_active, ActivePair, ProducerState};
use crate::state::identity::{cue_file_hash, IdentityResolver, TrackId};
use crate::state::revisions::{empty_file, RevisionStore};
use crate::storage::CueStore;

/// A connected producer: its reported state plus the way to reach it
struct ProducerEntry {
    state: ProducerState,
    sink: ProducerSink,
}

/// Single owner of all reconciliation state
pub struct Orchestrator {
    store: Arc<dyn CueStore>,
    identities: IdentityResolver,
    revisions: RevisionStore,
    producers: BTreeMap<ConnectionId, ProducerEntry>,
    editors: BTreeMap<ConnectionId, EditorSink>,
    subscribers: BTreeMap<ConnectionId, SubscriberSink>,
    /// File carried by the last `cue-file-modified` sent to every editor
    last_file_sent_to_all_editors: Option<CueFile>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn CueStore>, max_revisions: usize) -> Self {
        Self {
            store,
            identities: IdentityResolver::new(),
            revisions: RevisionStore::new(max_revisions),
            producers: BTreeMap::new(),
            editors: BTreeMap::new(),
            subscribers: BTreeMap::new(),
            last_file_sent_to_all_editors: None,
        }
    }

    /// Start the reconciliation loop on the Tokio runtime
    ///
    /// The loop ends once every handle and connection has been dropped.
    pub fn spawn(self) -> (OrchestratorHandle, JoinHandle<()>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(events_rx));
        (OrchestratorHandle::new(events_tx), task)
    }

    /// Consume events until the channel closes
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ConnectionEvent>) {
        info!("Reconciliation loop started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Reconciliation loop stopped");
    }

    /// Handle one event to completion
    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::ProducerConnected { id, sink } => {
                info!(producer = %id, "Producer connected");
                self.producers.insert(
                    id,
                    ProducerEntry {
                        state: ProducerState::new(id, time::now()),
                        sink,
                    },
                );
            }
            ConnectionEvent::ProducerUpdate { id, state } => {
                self.producer_updated(id, state).await;
            }
            ConnectionEvent::ProducerClosed { id } => {
                info!(producer = %id, "Producer disconnected");
                if self.producers.remove(&id).is_some() {
                    self.sync_all().await;
                }
            }
            ConnectionEvent::EditorConnected { id, sink } => {
                self.add_editor(id, sink).await;
            }
            ConnectionEvent::EditorEdit { id, track, file } => {
                self.editor_edited(id, track, file).await;
            }
            ConnectionEvent::EditorRequest { id, request, reply } => {
                self.editor_request(id, request, reply).await;
            }
            ConnectionEvent::EditorClosed { id } => {
                info!(editor = %id, "Editor disconnected");
                self.editors.remove(&id);
            }
            ConnectionEvent::SubscriberConnected { id, sink } => {
                self.add_subscriber(id, sink).await;
            }
            ConnectionEvent::SubscriberClosed { id } => {
                info!(subscriber = %id, "Subscriber disconnected");
                self.subscribers.remove(&id);
            }
            ConnectionEvent::Snapshot { reply } => {
                let snapshot = self.snapshot();
                let _ = reply.send(snapshot);
            }
        }
    }

    async fn producer_updated(&mut self, id: ConnectionId, state: ProducerPlayState) {
        let Some(entry) = self.producers.get_mut(&id) else {
            warn!(producer = %id, "Play state from unknown producer ignored");
            return;
        };
        debug!(producer = %id, layers = state.layers.len(), "Play state updated");
        entry.state.latest = Some(state);
        entry.state.last_updated = time::now();
        self.sync_all().await;
    }

    async fn add_editor(&mut self, id: ConnectionId, sink: EditorSink) {
        info!(editor = %id, "Editor connected");
        if let Some(active) = self.active_pair() {
            let (file, file_state) = self
                .track_content(&active.track.id, active.track.duration_millis)
                .await;
            push(&sink, id, EditorNotification::State { data: Some(active.editor_play_state()) });
            push(
                &sink,
                id,
                EditorNotification::CueFileModified {
                    id: active.track.id.to_string(),
                    file,
                    file_state,
                },
            );
        }
        self.editors.insert(id, sink);
    }

    async fn add_subscriber(&mut self, id: ConnectionId, sink: SubscriberSink) {
        info!(subscriber = %id, "Subscriber connected");
        let state = self.broadcast_state().await;
        push(&sink, id, state);
        self.subscribers.insert(id, sink);
    }

    async fn editor_edited(&mut self, editor: ConnectionId, track: TrackId, file: CueFile) {
        // An editor echoing back the file it was just sent is not an edit
        if self.last_file_sent_to_all_editors.as_ref() == Some(&file) {
            debug!(editor = %editor, track_id = %track, "Cue file unchanged, ignoring");
            return;
        }
        debug!(editor = %editor, track_id = %track, "Cue file modified");
        self.revisions.update(&track, file);
        self.sync_all().await;
    }

    async fn editor_request(
        &mut self,
        editor: ConnectionId,
        request: EditorRequest,
        reply: oneshot::Sender<Response>,
    ) {
        debug!(editor = %editor, ?request, "Editor request");
        match request {
            EditorRequest::FileAction { id, action } => {
                let success = self.file_action(&TrackId::new(id), action).await;
                let _ = reply.send(Response::from(success));
            }
            EditorRequest::Toggle => {
                self.forward_control(ProducerCommand { request: ControlRequest::Toggle, reply });
            }
            EditorRequest::Pause => {
                self.forward_control(ProducerCommand { request: ControlRequest::Pause, reply });
            }
            EditorRequest::GoToTime { position_millis } => {
                self.forward_control(ProducerCommand {
                    request: ControlRequest::GoToTime { position_millis },
                    reply,
                });
            }
        }
    }

    /// Hand a playback-control request to the active producer
    ///
    /// The producer adapter answers the editor directly through the reply channel.
    fn forward_control(&mut self, command: ProducerCommand) {
        let Some(active) = self.active_pair() else {
            let err = Error::Unavailable("no active controllers".to_string());
            warn!("{}", err);
            let _ = command.reply.send(Response::failure());
            return;
        };
        let Some(entry) = self.producers.get(&active.producer) else {
            let _ = command.reply.send(Response::failure());
            return;
        };
        if let Err(rejected) = entry.sink.send(command) {
            warn!(producer = %active.producer, "Producer channel closed, request failed");
            let _ = rejected.0.reply.send(Response::failure());
        }
    }

    async fn file_action(&mut self, track: &TrackId, action: FileAction) -> bool {
        let success = match action {
            FileAction::Undo => self.revisions.undo(track),
            FileAction::Redo => self.revisions.redo(track),
            FileAction::Save => match self.revisions.save(self.store.as_ref(), track).await {
                Ok(saved) => saved,
                Err(e) => {
                    error!(track_id = %track, "Failed to save cue file: {}", e);
                    false
                }
            },
        };
        info!(track_id = %track, %action, success, "File action");
        if success {
            self.sync_all().await;
        }
        success
    }

    /// Recompute and push to every editor and subscriber
    async fn sync_all(&mut self) {
        self.sync_editors().await;
        self.sync_subscribers().await;
    }

    async fn sync_editors(&mut self) {
        let Some(active) = self.active_pair() else {
            debug!(editors = self.editors.len(), "No active track");
            self.push_to_editors(EditorNotification::State { data: None });
            return;
        };

        debug!(editors = self.editors.len(), track_id = %active.track.id, "Sending state to editors");
        self.push_to_editors(EditorNotification::State { data: Some(active.editor_play_state()) });

        let (file, file_state) = self
            .track_content(&active.track.id, active.track.duration_millis)
            .await;
        self.last_file_sent_to_all_editors = Some(file.clone());
        self.push_to_editors(EditorNotification::CueFileModified {
            id: active.track.id.to_string(),
            file,
            file_state,
        });
    }

    async fn sync_subscribers(&mut self) {
        let state = self.broadcast_state().await;
        for (id, sink) in &self.subscribers {
            push(sink, *id, state.clone());
        }
    }

    fn push_to_editors(&self, notification: EditorNotification) {
        for (id, sink) in &self.editors {
            push(sink, *id, notification.clone());
        }
    }

    fn active_pair(&mut self) -> Option<ActivePair> {
        select_active(self.producers.values().map(|p| &p.state), &mut self.identities)
    }

    /// Current cue file and edit capabilities for a track
    async fn track_content(&self, track: &TrackId, duration_millis: f64) -> (CueFile, FileState) {
        let file_state = self.revisions.file_state(track);
        if let Some(file) = self.revisions.current_revision(track) {
            return (file.clone(), file_state);
        }
        match self.store.read(track).await {
            Ok(file) => (file, file_state),
            Err(Error::NotFound(_)) => (empty_file(duration_millis), file_state),
            Err(e) => {
                warn!(track_id = %track, "Failed to read saved cue file: {}", e);
                (empty_file(duration_millis), file_state)
            }
        }
    }

    /// Simplified state: every playing layer of every producer
    async fn broadcast_state(&mut self) -> BroadcastPlayState {
        let playing: Vec<(TrackMetadata, f64, f64)> = self
            .producers
            .values()
            .filter_map(|p| p.state.latest.as_ref())
            .flat_map(|latest| latest.layers.iter())
            .filter_map(|layer| match layer.state {
                LayerPlayState::Playing {
                    effective_start_time_millis,
                    play_speed,
                } => Some((layer.file.clone(), effective_start_time_millis, play_speed)),
                LayerPlayState::Paused { .. } => None,
            })
            .collect();

        let mut layers = Vec::with_capacity(playing.len());
        for (file, effective_start_time_millis, play_speed) in playing {
            let track = match self.identities.resolve_track(&file) {
                Ok(track) => track,
                Err(e) => {
                    warn!("Skipping layer in broadcast: {}", e);
                    continue;
                }
            };
            let (content, _) = self.track_content(&track.id, track.duration_millis).await;
            let file_hash = match cue_file_hash(&content) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(track_id = %track.id, "Failed to hash cue file: {}", e);
                    continue;
                }
            };
            layers.push(BroadcastLayerState {
                file_hash,
                amplitude: 1.0,
                effective_start_time_millis,
                play_speed,
            });
        }
        BroadcastPlayState { layers }
    }

    fn snapshot(&mut self) -> StatusSnapshot {
        let active_track = self.active_pair().map(|a| a.track.id.to_string());
        StatusSnapshot {
            producers: self.producers.len(),
            editors: self.editors.len(),
            subscribers: self.subscribers.len(),
            active_track,
        }
    }
}

/// Send one push; a closed channel means the connection is going away and its close event
/// is already queued
fn push<T>(sink: &mpsc::UnboundedSender<T>, id: ConnectionId, message: T) {
    if sink.send(message).is_err() {
        debug!(connection = %id, "Connection closed, dropping push");
    }
}
