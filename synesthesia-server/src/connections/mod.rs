//! Connection adapters
//!
//! Every participant talks to the reconciliation loop through a typed event channel. A
//! connection object is created from an [`OrchestratorHandle`]; creating it announces the
//! connection and dropping it announces the close, so the loop always sees a matching pair.
//! Outbound pushes travel back on a per-connection channel owned by the connection object.

mod editor;
mod producer;
mod subscriber;

pub use editor::EditorConnection;
pub use producer::ProducerConnection;
pub use subscriber::SubscriberConnection;

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synesthesia_common::protocol::{
    BroadcastPlayState, ControlRequest, EditorNotification, EditorRequest, ProducerPlayState,
    Response,
};
use synesthesia_common::CueFile;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::{Error, Result};
use crate::state::TrackId;

/// Handle identifying one connection for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A playback-control request on its way to a producer, with the slot for its answer
#[derive(Debug)]
pub struct ProducerCommand {
    pub request: ControlRequest,
    pub reply: oneshot::Sender<Response>,
}

impl ProducerCommand {
    /// Split into the request and a reply slot that gives up after `limit`
    ///
    /// Whoever asked receives `{success: false}` if the producer has not answered in time or
    /// the slot is dropped unanswered. A late answer is discarded.
    pub fn with_timeout(self, limit: Duration) -> (ControlRequest, oneshot::Sender<Response>) {
        let ProducerCommand { request, reply } = self;
        let (slot, answer) = oneshot::channel();
        tokio::spawn(async move {
            let response = match tokio::time::timeout(limit, answer).await {
                Ok(Ok(response)) => response,
                Ok(Err(_)) => Response::failure(),
                Err(_) => {
                    warn!(?limit, "Producer did not answer in time");
                    Response::failure()
                }
            };
            let _ = reply.send(response);
        });
        (request, slot)
    }
}

/// Outbound channel to a producer
pub type ProducerSink = mpsc::UnboundedSender<ProducerCommand>;
/// Outbound channel to an editor
pub type EditorSink = mpsc::UnboundedSender<EditorNotification>;
/// Outbound channel to a subscriber
pub type SubscriberSink = mpsc::UnboundedSender<BroadcastPlayState>;

/// Everything the reconciliation loop reacts to
#[derive(Debug)]
pub enum ConnectionEvent {
    ProducerConnected {
        id: ConnectionId,
        sink: ProducerSink,
    },
    ProducerUpdate {
        id: ConnectionId,
        state: ProducerPlayState,
    },
    ProducerClosed {
        id: ConnectionId,
    },
    EditorConnected {
        id: ConnectionId,
        sink: EditorSink,
    },
    EditorEdit {
        id: ConnectionId,
        track: TrackId,
        file: CueFile,
    },
    EditorRequest {
        id: ConnectionId,
        request: EditorRequest,
        reply: oneshot::Sender<Response>,
    },
    EditorClosed {
        id: ConnectionId,
    },
    SubscriberConnected {
        id: ConnectionId,
        sink: SubscriberSink,
    },
    SubscriberClosed {
        id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<StatusSnapshot>,
    },
}

/// Registry summary for the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub producers: usize,
    pub editors: usize,
    pub subscribers: usize,
    /// Track id of the active pair, if any
    pub active_track: Option<String>,
}

/// Cloneable entry point for creating connections
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    events: mpsc::UnboundedSender<ConnectionEvent>,
    next_id: Arc<AtomicU64>,
}

impl OrchestratorHandle {
    pub(crate) fn new(events: mpsc::UnboundedSender<ConnectionEvent>) -> Self {
        Self {
            events,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn allocate_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a new producer
    pub fn connect_producer(&self) -> ProducerConnection {
        let id = self.allocate_id();
        let (sink, commands) = mpsc::unbounded_channel();
        send_event(&self.events, ConnectionEvent::ProducerConnected { id, sink });
        ProducerConnection::new(id, self.events.clone(), commands)
    }

    /// Register a new editor
    pub fn connect_editor(&self) -> EditorConnection {
        let id = self.allocate_id();
        let (sink, pushes) = mpsc::unbounded_channel();
        send_event(&self.events, ConnectionEvent::EditorConnected { id, sink });
        EditorConnection::new(id, self.events.clone(), pushes)
    }

    /// Register a new subscriber
    pub fn connect_subscriber(&self) -> SubscriberConnection {
        let id = self.allocate_id();
        let (sink, states) = mpsc::unbounded_channel();
        send_event(&self.events, ConnectionEvent::SubscriberConnected { id, sink });
        SubscriberConnection::new(id, self.events.clone(), states)
    }

    /// Ask the loop for a summary of its registries
    pub async fn snapshot(&self) -> Result<StatusSnapshot> {
        let (reply, answer) = oneshot::channel();
        self.events
            .send(ConnectionEvent::Snapshot { reply })
            .map_err(|_| Error::Internal("reconciliation loop has stopped".to_string()))?;
        answer
            .await
            .map_err(|_| Error::Internal("reconciliation loop dropped the request".to_string()))
    }
}

/// Queue an event; a stopped loop only happens during shutdown, so the event is dropped
fn send_event(events: &mpsc::UnboundedSender<ConnectionEvent>, event: ConnectionEvent) -> bool {
    if events.send(event).is_err() {
        tracing::debug!("Reconciliation loop stopped, dropping event");
        return false;
    }
    true
}
