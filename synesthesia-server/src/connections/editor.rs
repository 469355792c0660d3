//! Editor (composer) connection

use std::future::Future;
use synesthesia_common::protocol::{EditorNotification, EditorRequest, Response};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{send_event, ConnectionEvent, ConnectionId};
use crate::state::TrackId;

/// One connected editor
///
/// Dropping the connection reports it closed.
#[derive(Debug)]
pub struct EditorConnection {
    id: ConnectionId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    pushes: mpsc::UnboundedReceiver<EditorNotification>,
}

impl EditorConnection {
    pub(super) fn new(
        id: ConnectionId,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        pushes: mpsc::UnboundedReceiver<EditorNotification>,
    ) -> Self {
        Self { id, events, pushes }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// A notification arrived from the editor
    ///
    /// Only `cue-file-modified` means anything to the server; anything else is ignored.
    pub fn notify(&self, notification: EditorNotification) {
        match notification {
            EditorNotification::CueFileModified { id, file, .. } => {
                send_event(
                    &self.events,
                    ConnectionEvent::EditorEdit {
                        id: self.id,
                        track: TrackId::new(id),
                        file,
                    },
                );
            }
            other => debug!(editor = %self.id, "Ignoring editor notification {:?}", other),
        }
    }

    /// Submit a request from the editor
    ///
    /// The request is queued immediately, keeping its order relative to notifications; the
    /// returned future resolves with the outcome and does not borrow the connection.
    pub fn request(&self, request: EditorRequest) -> impl Future<Output = Response> + Send + 'static {
        let (reply, answer) = oneshot::channel();
        let queued = send_event(
            &self.events,
            ConnectionEvent::EditorRequest {
                id: self.id,
                request,
                reply,
            },
        );
        async move {
            if !queued {
                return Response::failure();
            }
            answer.await.unwrap_or_else(|_| Response::failure())
        }
    }

    /// Next push (play state or cue file notification) for the editor
    pub async fn next_push(&mut self) -> Option<EditorNotification> {
        self.pushes.recv().await
    }
}

impl Drop for EditorConnection {
    fn drop(&mut self) {
        send_event(&self.events, ConnectionEvent::EditorClosed { id: self.id });
    }
}
