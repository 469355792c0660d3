//! Downstream subscriber connection

use synesthesia_common::protocol::BroadcastPlayState;
use tokio::sync::mpsc;

use super::{send_event, ConnectionEvent, ConnectionId};

/// One connected subscriber; dropping it reports it closed
#[derive(Debug)]
pub struct SubscriberConnection {
    id: ConnectionId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    states: mpsc::UnboundedReceiver<BroadcastPlayState>,
}

impl SubscriberConnection {
    pub(super) fn new(
        id: ConnectionId,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        states: mpsc::UnboundedReceiver<BroadcastPlayState>,
    ) -> Self {
        Self { id, events, states }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Next simplified state pushed to this subscriber
    pub async fn next_state(&mut self) -> Option<BroadcastPlayState> {
        self.states.recv().await
    }
}

impl Drop for SubscriberConnection {
    fn drop(&mut self) {
        send_event(&self.events, ConnectionEvent::SubscriberClosed { id: self.id });
    }
}
